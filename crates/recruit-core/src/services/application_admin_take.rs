use std::sync::Arc;

use crate::{
    domain::{AdminProcessingApplication, ApplicationId, ApplicationStatus, UserId},
    errors::Error,
    ports::{finish, Transaction, UnitOfWork},
    Result,
};

/// Lets an admin claim one WAITING application at a time.
pub struct ApplicationAdminTakeService {
    uow: Arc<dyn UnitOfWork>,
}

impl ApplicationAdminTakeService {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    pub async fn take(
        &self,
        admin_id: UserId,
        application_id: ApplicationId,
    ) -> Result<AdminProcessingApplication> {
        let mut tx = self.uow.begin().await?;
        let result = Self::run(tx.as_mut(), admin_id, application_id).await;
        finish(tx, result).await
    }

    async fn run(
        tx: &mut dyn Transaction,
        admin_id: UserId,
        application_id: ApplicationId,
    ) -> Result<AdminProcessingApplication> {
        let mut application = tx.applications().get_by_id(application_id).await?;
        // Wrong status is a fault; `finish` logs it at error level.
        if application.status != ApplicationStatus::Waiting {
            return Err(Error::ApplicationWrongStatus {
                status: application.status,
            });
        }

        if let Some(held) = tx.claims().get_by_admin_id(admin_id).await? {
            tracing::error!(
                application = application_id.0,
                admin = admin_id.0,
                held = held.application_id.0,
                "admin is already processing an application"
            );
            return Err(Error::AdminAlreadyProcessedApplication);
        }

        application.take(admin_id)?;
        tx.applications().update_status(&application).await?;
        let claim = tx
            .claims()
            .create(admin_id, application_id)
            .await
            .map_err(Error::into_domain)?;

        tracing::info!(
            application = application_id.0,
            admin = admin_id.0,
            "application taken for review"
        );
        Ok(claim)
    }
}

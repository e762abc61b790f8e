use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    domain::{Application, ApplicationId, ApplicationStatus, UserId},
    errors::Error,
    ports::{finish, Transaction, UnitOfWork},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decision {
    Accept,
    Reject,
}

/// Closes a review: accept or reject, then release the admin's claim.
pub struct ApplicationDecisionService {
    uow: Arc<dyn UnitOfWork>,
}

impl ApplicationDecisionService {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    pub async fn accept(
        &self,
        admin_id: UserId,
        application_id: ApplicationId,
        invite_link: Option<String>,
    ) -> Result<Application> {
        self.accept_at(admin_id, application_id, invite_link, Utc::now())
            .await
    }

    pub async fn accept_at(
        &self,
        admin_id: UserId,
        application_id: ApplicationId,
        invite_link: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Application> {
        let mut tx = self.uow.begin().await?;
        let result = Self::run(
            tx.as_mut(),
            admin_id,
            application_id,
            Decision::Accept,
            invite_link,
            now,
        )
        .await;
        finish(tx, result).await
    }

    pub async fn reject(
        &self,
        admin_id: UserId,
        application_id: ApplicationId,
    ) -> Result<Application> {
        self.reject_at(admin_id, application_id, Utc::now()).await
    }

    pub async fn reject_at(
        &self,
        admin_id: UserId,
        application_id: ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<Application> {
        let mut tx = self.uow.begin().await?;
        let result = Self::run(
            tx.as_mut(),
            admin_id,
            application_id,
            Decision::Reject,
            None,
            now,
        )
        .await;
        finish(tx, result).await
    }

    async fn run(
        tx: &mut dyn Transaction,
        admin_id: UserId,
        application_id: ApplicationId,
        decision: Decision,
        invite_link: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Application> {
        let mut application = tx.applications().get_by_id(application_id).await?;
        if application.status != ApplicationStatus::Processing {
            return Err(Error::ApplicationWrongStatus {
                status: application.status,
            });
        }
        if application.admin_id != Some(admin_id) {
            return Err(Error::ApplicationClaimedByAnotherAdmin);
        }

        match decision {
            Decision::Accept => application.accept(now, invite_link)?,
            Decision::Reject => application.reject(now)?,
        }
        tx.applications().update_status(&application).await?;

        if tx
            .claims()
            .delete_by_application_id(application_id)
            .await?
            .is_none()
        {
            tracing::warn!(
                application = application_id.0,
                "decided application had no claim row"
            );
        }

        tracing::info!(
            application = application_id.0,
            admin = admin_id.0,
            status = %application.status,
            "application decided"
        );
        Ok(application)
    }
}

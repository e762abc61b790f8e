use std::sync::Arc;

use crate::{
    domain::ApplicationId,
    formatting::render_application,
    ports::{finish, UnitOfWork},
    Result,
};

/// Renders applications as MarkdownV2 reports for the admin chat.
pub struct ApplicationFormattingService {
    uow: Arc<dyn UnitOfWork>,
}

impl ApplicationFormattingService {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    pub async fn format(&self, application_id: ApplicationId) -> Result<String> {
        let mut tx = self.uow.begin().await?;
        let result = tx.applications().get_by_id(application_id).await;
        let application = finish(tx, result).await?;
        Ok(render_application(&application))
    }
}

use std::sync::Arc;

use crate::{
    domain::{Application, ChatId, UserId},
    errors::Error,
    messaging::port::MessagingPort,
    ports::{finish, UnitOfWork},
    Result,
};

/// Read side: the latest application of a user.
#[derive(Clone)]
pub struct ApplicationRetrieveService {
    uow: Arc<dyn UnitOfWork>,
}

impl ApplicationRetrieveService {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    /// `None` when the user never applied.
    pub async fn retrieve(&self, user_id: UserId) -> Result<Option<Application>> {
        let mut tx = self.uow.begin().await?;
        let result = match tx.applications().retrieve_last(user_id).await {
            Ok(application) => Ok(Some(application)),
            Err(Error::ApplicationDoesNotExist) => Ok(None),
            Err(e) => Err(e),
        };
        finish(tx, result).await
    }
}

/// Revokes a joined member's single-use invite so it cannot be shared further.
pub struct InviteRevocationService {
    retrieve: ApplicationRetrieveService,
    messenger: Arc<dyn MessagingPort>,
    clan_chat: ChatId,
}

impl InviteRevocationService {
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        messenger: Arc<dyn MessagingPort>,
        clan_chat: ChatId,
    ) -> Self {
        Self {
            retrieve: ApplicationRetrieveService::new(uow),
            messenger,
            clan_chat,
        }
    }

    /// Returns whether a link was revoked.
    pub async fn revoke_on_join(&self, user_id: UserId) -> Result<bool> {
        let Some(application) = self.retrieve.retrieve(user_id).await? else {
            tracing::warn!(user = user_id.0, "member joined without an application");
            return Ok(false);
        };
        let Some(link) = application.invite_link.as_deref() else {
            tracing::warn!(
                user = user_id.0,
                application = application.id.0,
                "member joined but the application has no invite link"
            );
            return Ok(false);
        };

        self.messenger
            .revoke_invite_link(self.clan_chat, link)
            .await?;
        tracing::info!(
            user = user_id.0,
            application = application.id.0,
            "invite link revoked"
        );
        Ok(true)
    }
}

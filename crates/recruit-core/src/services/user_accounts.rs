use std::sync::Arc;

use crate::{
    domain::{NewUser, User, UserId},
    errors::Error,
    ports::{finish, Transaction, UnitOfWork},
    Result,
};

/// Creates users on first contact and toggles bans.
pub struct UserAccountService {
    uow: Arc<dyn UnitOfWork>,
}

impl UserAccountService {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    /// Register `profile`, or refresh the stored names if the user already exists.
    pub async fn ensure_exists(&self, profile: NewUser) -> Result<User> {
        let mut tx = self.uow.begin().await?;
        let result = Self::ensure_in(tx.as_mut(), profile).await;
        finish(tx, result).await
    }

    pub async fn ban(&self, user_id: UserId) -> Result<User> {
        self.set_banned(user_id, true).await
    }

    pub async fn unban(&self, user_id: UserId) -> Result<User> {
        self.set_banned(user_id, false).await
    }

    async fn set_banned(&self, user_id: UserId, banned: bool) -> Result<User> {
        let mut tx = self.uow.begin().await?;
        let result = Self::set_banned_in(tx.as_mut(), user_id, banned).await;
        finish(tx, result).await
    }

    async fn ensure_in(tx: &mut dyn Transaction, profile: NewUser) -> Result<User> {
        match tx.users().get_by_id(profile.id).await? {
            Some(mut user) => {
                if user.refresh_profile(&profile) {
                    tx.users().update(&user).await?;
                }
                Ok(user)
            }
            None => {
                let user = tx.users().create(profile).await?;
                tracing::info!(user = user.id.0, "user registered");
                Ok(user)
            }
        }
    }

    async fn set_banned_in(
        tx: &mut dyn Transaction,
        user_id: UserId,
        banned: bool,
    ) -> Result<User> {
        let mut user = tx
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(Error::UserNotFound(user_id))?;
        if user.is_banned != banned {
            user.is_banned = banned;
            tx.users().update(&user).await?;
            tracing::info!(user = user_id.0, banned, "ban state changed");
        }
        Ok(user)
    }
}

//! Persistence boundary: a unit of work handing out repositories inside one
//! transaction.
//!
//! Every transaction ends in exactly one of `commit` or `rollback`. Implementations
//! must treat a transaction dropped without `commit` as rolled back.

use async_trait::async_trait;

use crate::{
    domain::{
        AdminProcessingApplication, Application, ApplicationAnswer, ApplicationId, NewUser, User,
        UserId,
    },
    Result,
};

#[async_trait]
pub trait UserRepository: Send {
    async fn get_by_id(&mut self, id: UserId) -> Result<Option<User>>;
    async fn create(&mut self, user: NewUser) -> Result<User>;
    async fn update(&mut self, user: &User) -> Result<()>;
}

#[async_trait]
pub trait ApplicationRepository: Send {
    /// Load with answers attached. `ApplicationDoesNotExist` when absent.
    async fn get_by_id(&mut self, id: ApplicationId) -> Result<Application>;

    /// New IN_PROGRESS application without answers.
    async fn create(&mut self, user_id: UserId) -> Result<Application>;

    /// Persist status, admin, decision date and invite link.
    async fn update_status(&mut self, application: &Application) -> Result<()>;

    /// The user's most recent application. `ApplicationDoesNotExist` when none.
    async fn retrieve_last(&mut self, user_id: UserId) -> Result<Application>;
}

#[async_trait]
pub trait ApplicationAnswerRepository: Send {
    /// Insert or overwrite the answer for its (application, question) pair.
    async fn save(&mut self, answer: &ApplicationAnswer) -> Result<()>;
    async fn delete_all_answers_by_application_id(&mut self, id: ApplicationId) -> Result<()>;
}

#[async_trait]
pub trait AdminProcessingApplicationRepository: Send {
    async fn get_by_admin_id(
        &mut self,
        admin_id: UserId,
    ) -> Result<Option<AdminProcessingApplication>>;

    async fn create(
        &mut self,
        admin_id: UserId,
        application_id: ApplicationId,
    ) -> Result<AdminProcessingApplication>;

    /// Release the claim on `application_id`, returning it if one existed.
    async fn delete_by_application_id(
        &mut self,
        application_id: ApplicationId,
    ) -> Result<Option<AdminProcessingApplication>>;
}

#[async_trait]
pub trait Transaction: Send {
    fn users(&mut self) -> &mut dyn UserRepository;
    fn applications(&mut self) -> &mut dyn ApplicationRepository;
    fn answers(&mut self) -> &mut dyn ApplicationAnswerRepository;
    fn claims(&mut self) -> &mut dyn AdminProcessingApplicationRepository;

    async fn commit(&mut self) -> Result<()>;
    async fn rollback(&mut self) -> Result<()>;
}

#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}

/// Close `tx` according to `result`: commit on success, roll back on failure.
///
/// The original error wins over a failed rollback.
pub async fn finish<T: Send>(mut tx: Box<dyn Transaction>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if err.is_fault() {
                tracing::error!(error = %err, "transaction rolled back");
            } else {
                tracing::debug!(error = %err, "transaction rolled back");
            }
            if let Err(rb) = tx.rollback().await {
                tracing::warn!(error = %rb, "rollback failed");
            }
            Err(err)
        }
    }
}

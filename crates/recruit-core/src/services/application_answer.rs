use std::sync::Arc;

use crate::{
    domain::{Application, ApplicationStatus, QuestionKey, UserId},
    errors::Error,
    ports::{finish, Transaction, UnitOfWork},
    Result,
};

/// Where the form stands after an answer.
#[derive(Clone, Debug)]
pub struct AnswerProgress {
    pub application: Application,
    /// `None` when the form was already complete and the text was not recorded.
    pub answered: Option<QuestionKey>,
    /// `None` once every question has an answer.
    pub next: Option<QuestionKey>,
    /// The form was complete and moved to WAITING in the same transaction.
    pub submitted: bool,
}

/// Records conversational answers and hands completed forms to review.
pub struct ApplicationAnswerService {
    uow: Arc<dyn UnitOfWork>,
}

impl ApplicationAnswerService {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    /// Store `text` as the answer to the first unanswered question. The last answer
    /// submits the form. A complete form still IN_PROGRESS is submitted without
    /// recording `text`.
    pub async fn answer_next(&self, user_id: UserId, text: &str) -> Result<AnswerProgress> {
        let mut tx = self.uow.begin().await?;
        let result = Self::record(tx.as_mut(), user_id, text).await;
        finish(tx, result).await
    }

    /// IN_PROGRESS -> WAITING once all five answers are in.
    pub async fn submit(&self, user_id: UserId) -> Result<Application> {
        let mut tx = self.uow.begin().await?;
        let result = Self::submit_in(tx.as_mut(), user_id).await;
        finish(tx, result).await
    }

    async fn in_progress(tx: &mut dyn Transaction, user_id: UserId) -> Result<Application> {
        let user = tx
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(Error::UserNotFound(user_id))?;
        if user.is_banned {
            return Err(Error::UserIsBanned);
        }

        let application = tx.applications().retrieve_last(user_id).await?;
        if application.status != ApplicationStatus::InProgress {
            return Err(Error::ApplicationWrongStatus {
                status: application.status,
            });
        }
        Ok(application)
    }

    async fn record(
        tx: &mut dyn Transaction,
        user_id: UserId,
        text: &str,
    ) -> Result<AnswerProgress> {
        let mut application = Self::in_progress(tx, user_id).await?;
        let answered = match application.next_unanswered() {
            Some(key) => {
                let answer = application.answer(key, text)?.clone();
                tx.answers().save(&answer).await?;
                tracing::debug!(
                    user = user_id.0,
                    application = application.id.0,
                    question = %key,
                    "answer recorded"
                );
                Some(key)
            }
            None => None,
        };

        let next = application.next_unanswered();
        let submitted = next.is_none();
        if submitted {
            Self::hand_over(tx, &mut application).await?;
        }
        Ok(AnswerProgress {
            application,
            answered,
            next,
            submitted,
        })
    }

    async fn submit_in(tx: &mut dyn Transaction, user_id: UserId) -> Result<Application> {
        let mut application = Self::in_progress(tx, user_id).await?;
        Self::hand_over(tx, &mut application).await?;
        Ok(application)
    }

    async fn hand_over(tx: &mut dyn Transaction, application: &mut Application) -> Result<()> {
        application.submit()?;
        tx.applications().update_status(application).await?;
        tracing::info!(
            user = application.user_id.0,
            application = application.id.0,
            "application submitted"
        );
        Ok(())
    }
}

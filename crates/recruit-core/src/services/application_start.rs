use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    domain::{Application, ApplicationStatus, UserId, DEFAULT_COOLDOWN_DAYS},
    errors::Error,
    ports::{finish, Transaction, UnitOfWork},
    Result,
};

/// What `start` does with the user's latest application.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StartPlan {
    Create,
    Reset(Application),
}

/// Decide how a user may (re)start, given their latest application.
///
/// Total over [`ApplicationStatus`]; every failure here is raised before any write.
pub(crate) fn plan_start(
    last: Option<Application>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> Result<StartPlan> {
    let Some(app) = last else {
        return Ok(StartPlan::Create);
    };

    match app.status {
        ApplicationStatus::InProgress => Ok(StartPlan::Reset(app)),
        ApplicationStatus::Waiting | ApplicationStatus::Processing => {
            Err(Error::ApplicationAtWaitingStatus)
        }
        ApplicationStatus::Accepted => Err(Error::ApplicationAlreadyAccepted),
        ApplicationStatus::Rejected => {
            let eligible_at = app.cooldown_ends(cooldown)?;
            if now >= eligible_at {
                Ok(StartPlan::Create)
            } else {
                Err(Error::ApplicationCoolDown { eligible_at })
            }
        }
    }
}

/// Decides whether a user may fill in an application and opens (or resets) one.
pub struct ApplicationStartService {
    uow: Arc<dyn UnitOfWork>,
    cooldown: Duration,
}

impl ApplicationStartService {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self {
            uow,
            cooldown: Duration::days(DEFAULT_COOLDOWN_DAYS),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub async fn start(&self, user_id: UserId) -> Result<Application> {
        self.start_at(user_id, Utc::now()).await
    }

    pub async fn start_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<Application> {
        let mut tx = self.uow.begin().await?;
        let result = self.run(tx.as_mut(), user_id, now).await;
        finish(tx, result).await
    }

    async fn run(
        &self,
        tx: &mut dyn Transaction,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Application> {
        let user = tx
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(Error::UserNotFound(user_id))?;
        if user.is_banned {
            return Err(Error::UserIsBanned);
        }

        let last = match tx.applications().retrieve_last(user_id).await {
            Ok(app) => Some(app),
            Err(Error::ApplicationDoesNotExist) => None,
            Err(e) => return Err(e),
        };

        match plan_start(last, now, self.cooldown)? {
            StartPlan::Create => {
                let app = tx
                    .applications()
                    .create(user_id)
                    .await
                    .map_err(Error::into_domain)?;
                tracing::info!(user = user_id.0, application = app.id.0, "application created");
                Ok(app)
            }
            StartPlan::Reset(mut app) => {
                app.clear();
                tx.answers()
                    .delete_all_answers_by_application_id(app.id)
                    .await?;
                tracing::info!(user = user_id.0, application = app.id.0, "application reset");
                Ok(app)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{storage::MemoryStore, testing::*};

    fn service(store: &MemoryStore) -> ApplicationStartService {
        ApplicationStartService::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn first_start_creates_empty_in_progress_application() {
        let store = MemoryStore::new();
        seed_user(&store, 1, false).await;

        let app = service(&store).start(UserId(1)).await.unwrap();
        assert_eq!(app.status, ApplicationStatus::InProgress);
        assert!(app.answers.is_empty());

        let stored = load(&store, app.id).await;
        assert_eq!(stored.user_id, UserId(1));
    }

    #[tokio::test]
    async fn restart_mid_form_resets_the_same_row() {
        let store = MemoryStore::new();
        seed_user(&store, 1, false).await;
        let svc = service(&store);

        let first = svc.start(UserId(1)).await.unwrap();
        save_answer(&store, first.id, 1).await;
        save_answer(&store, first.id, 2).await;
        assert_eq!(load(&store, first.id).await.answers.len(), 2);

        let again = svc.start(UserId(1)).await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.status, ApplicationStatus::InProgress);
        assert!(again.answers.is_empty());
        assert!(load(&store, first.id).await.answers.is_empty());
    }

    #[tokio::test]
    async fn application_under_review_blocks_start_without_writes() {
        for status in [ApplicationStatus::Waiting, ApplicationStatus::Processing] {
            let store = MemoryStore::new();
            seed_user(&store, 1, false).await;
            seed_application(&store, 1, status, None).await;
            let before = store.snapshot().await.unwrap();

            match service(&store).start(UserId(1)).await {
                Err(Error::ApplicationAtWaitingStatus) => {}
                other => panic!("{status}: expected waiting status, got {other:?}"),
            }
            assert_eq!(store.snapshot().await.unwrap(), before);
        }
    }

    #[tokio::test]
    async fn accepted_application_is_final() {
        let store = MemoryStore::new();
        seed_user(&store, 1, false).await;
        seed_application(
            &store,
            1,
            ApplicationStatus::Accepted,
            Some(day(2025, 1, 1)),
        )
        .await;

        assert!(matches!(
            service(&store).start(UserId(1)).await,
            Err(Error::ApplicationAlreadyAccepted)
        ));
    }

    #[tokio::test]
    async fn rejected_applicant_waits_out_the_cooldown() {
        let store = MemoryStore::new();
        seed_user(&store, 1, false).await;
        let decided = day(2026, 1, 10);
        let rejected =
            seed_application(&store, 1, ApplicationStatus::Rejected, Some(decided)).await;
        let svc = service(&store);

        match svc.start_at(UserId(1), decided + Duration::days(29)).await {
            Err(Error::ApplicationCoolDown { eligible_at }) => {
                assert_eq!(eligible_at, decided + Duration::days(30));
            }
            other => panic!("expected cooldown, got {other:?}"),
        }

        let fresh = svc
            .start_at(UserId(1), decided + Duration::days(31))
            .await
            .unwrap();
        assert_ne!(fresh.id, rejected.id);
        assert_eq!(fresh.status, ApplicationStatus::InProgress);
        assert_eq!(
            load(&store, rejected.id).await.status,
            ApplicationStatus::Rejected
        );
    }

    #[tokio::test]
    async fn cooldown_boundary_is_inclusive() {
        let store = MemoryStore::new();
        seed_user(&store, 1, false).await;
        let decided = day(2026, 1, 10);
        seed_application(&store, 1, ApplicationStatus::Rejected, Some(decided)).await;
        let svc = service(&store);

        let just_before = decided + Duration::days(30) - Duration::seconds(1);
        assert!(matches!(
            svc.start_at(UserId(1), just_before).await,
            Err(Error::ApplicationCoolDown { .. })
        ));
        assert!(svc
            .start_at(UserId(1), decided + Duration::days(30))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn configured_cooldown_is_honoured() {
        let store = MemoryStore::new();
        seed_user(&store, 1, false).await;
        let decided = day(2026, 1, 10);
        seed_application(&store, 1, ApplicationStatus::Rejected, Some(decided)).await;
        let svc = service(&store).with_cooldown(Duration::days(7));

        assert!(svc
            .start_at(UserId(1), decided + Duration::days(7))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn rejected_without_decision_date_is_an_integrity_fault() {
        let store = MemoryStore::new();
        seed_user(&store, 1, false).await;
        seed_application(&store, 1, ApplicationStatus::Rejected, None).await;
        let before = store.snapshot().await.unwrap();

        match service(&store).start(UserId(1)).await {
            Err(e @ Error::ApplicationDecisionDateNotFound) => assert!(e.is_fault()),
            other => panic!("expected missing decision date, got {other:?}"),
        }
        assert_eq!(store.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn unknown_and_banned_users_cannot_start() {
        let store = MemoryStore::new();
        seed_user(&store, 2, true).await;
        let svc = service(&store);

        assert!(matches!(
            svc.start(UserId(1)).await,
            Err(Error::UserNotFound(UserId(1)))
        ));
        assert!(matches!(
            svc.start(UserId(2)).await,
            Err(Error::UserIsBanned)
        ));
    }

    #[test]
    fn every_status_has_a_defined_outcome() {
        let now = day(2026, 6, 1);
        let cooldown = Duration::days(30);
        for status in ApplicationStatus::ALL {
            let mut app = Application::new(
                crate::domain::ApplicationId(1),
                UserId(1),
                day(2026, 1, 1),
            );
            app.status = status;
            app.decision_date = Some(day(2026, 1, 2));
            let outcome = plan_start(Some(app), now, cooldown);
            match status {
                ApplicationStatus::InProgress => {
                    assert!(matches!(outcome, Ok(StartPlan::Reset(_))))
                }
                ApplicationStatus::Rejected => assert_eq!(outcome.unwrap(), StartPlan::Create),
                _ => assert!(
                    !matches!(outcome, Err(Error::ApplicationWrongStatus { .. })),
                    "{status} fell through to the wrong-status fallback"
                ),
            }
        }
        assert_eq!(plan_start(None, now, cooldown).unwrap(), StartPlan::Create);
    }
}

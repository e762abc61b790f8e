use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    domain::{
        AdminProcessingApplication, Application, ApplicationAnswer, ApplicationId, ClaimId,
        NewUser, User, UserId,
    },
    errors::{Constraint, Error},
    ports::{
        AdminProcessingApplicationRepository, ApplicationAnswerRepository, ApplicationRepository,
        Transaction, UnitOfWork, UserRepository,
    },
    Result,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreState {
    users: BTreeMap<i64, User>,
    applications: BTreeMap<i64, Application>,
    answers: Vec<ApplicationAnswer>,
    claims: Vec<AdminProcessingApplication>,
    last_application_id: i64,
    last_claim_id: i64,
}

impl StoreState {
    fn with_answers(&self, application: &Application) -> Application {
        let mut out = application.clone();
        out.answers = self
            .answers
            .iter()
            .filter(|a| a.application_id == application.id)
            .map(|a| (a.question, a.clone()))
            .collect();
        out
    }

    fn active_application_of(&self, user_id: UserId) -> Option<&Application> {
        self.applications
            .values()
            .find(|a| a.user_id == user_id && a.status.is_active())
    }
}

/// Process-local unit of work.
///
/// A transaction holds the store lock for its whole lifetime and works on a staged
/// copy, so transactions are serializable and rollback just drops the copy. With a
/// snapshot path, each commit also rewrites the JSON snapshot before publishing.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted at `path`, loading it when the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<StoreState>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(Error::Io(e)),
        };
        tracing::info!(
            path = %path.display(),
            users = state.users.len(),
            applications = state.applications.len(),
            "store opened"
        );
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            snapshot_path: Some(path),
        })
    }

    /// JSON rendering of the committed state.
    pub async fn snapshot(&self) -> Result<String> {
        let state = self.state.lock().await;
        Ok(serde_json::to_string_pretty(&*state)?)
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            staged,
            snapshot_path: self.snapshot_path.clone(),
            finished: false,
        }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    staged: StoreState,
    snapshot_path: Option<PathBuf>,
    finished: bool,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(Error::Storage("transaction already finished".to_string()));
        }
        Ok(())
    }
}

async fn write_snapshot(path: &Path, state: &StoreState) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(state)?).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("transaction dropped without commit, discarding changes");
        }
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn users(&mut self) -> &mut dyn UserRepository {
        self
    }

    fn applications(&mut self) -> &mut dyn ApplicationRepository {
        self
    }

    fn answers(&mut self) -> &mut dyn ApplicationAnswerRepository {
        self
    }

    fn claims(&mut self) -> &mut dyn AdminProcessingApplicationRepository {
        self
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.finished = true;
        let staged = std::mem::take(&mut self.staged);
        if let Some(path) = &self.snapshot_path {
            write_snapshot(path, &staged).await?;
        }
        *self.guard = staged;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.finished = true;
        self.staged = StoreState::default();
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryTransaction {
    async fn get_by_id(&mut self, id: UserId) -> Result<Option<User>> {
        self.ensure_open()?;
        Ok(self.staged.users.get(&id.0).cloned())
    }

    async fn create(&mut self, user: NewUser) -> Result<User> {
        self.ensure_open()?;
        if self.staged.users.contains_key(&user.id.0) {
            return Err(Error::Conflict(Constraint::UserIdentity));
        }
        let user = User::register(user);
        self.staged.users.insert(user.id.0, user.clone());
        Ok(user)
    }

    async fn update(&mut self, user: &User) -> Result<()> {
        self.ensure_open()?;
        let slot = self
            .staged
            .users
            .get_mut(&user.id.0)
            .ok_or(Error::UserNotFound(user.id))?;
        *slot = user.clone();
        Ok(())
    }
}

#[async_trait]
impl ApplicationRepository for MemoryTransaction {
    async fn get_by_id(&mut self, id: ApplicationId) -> Result<Application> {
        self.ensure_open()?;
        let app = self
            .staged
            .applications
            .get(&id.0)
            .ok_or(Error::ApplicationDoesNotExist)?;
        Ok(self.staged.with_answers(app))
    }

    async fn create(&mut self, user_id: UserId) -> Result<Application> {
        self.ensure_open()?;
        if self.staged.active_application_of(user_id).is_some() {
            return Err(Error::Conflict(Constraint::ActiveApplicationPerUser));
        }
        self.staged.last_application_id += 1;
        let id = ApplicationId(self.staged.last_application_id);
        let app = Application::new(id, user_id, Utc::now());
        self.staged.applications.insert(id.0, app.clone());
        Ok(app)
    }

    async fn update_status(&mut self, application: &Application) -> Result<()> {
        self.ensure_open()?;
        if application.status.is_active() {
            if let Some(other) = self.staged.active_application_of(application.user_id) {
                if other.id != application.id {
                    return Err(Error::Conflict(Constraint::ActiveApplicationPerUser));
                }
            }
        }
        let stored = self
            .staged
            .applications
            .get_mut(&application.id.0)
            .ok_or(Error::ApplicationDoesNotExist)?;
        stored.status = application.status;
        stored.admin_id = application.admin_id;
        stored.decision_date = application.decision_date;
        stored.invite_link = application.invite_link.clone();
        Ok(())
    }

    async fn retrieve_last(&mut self, user_id: UserId) -> Result<Application> {
        self.ensure_open()?;
        let app = self
            .staged
            .applications
            .values()
            .rev()
            .find(|a| a.user_id == user_id)
            .ok_or(Error::ApplicationDoesNotExist)?;
        Ok(self.staged.with_answers(app))
    }
}

#[async_trait]
impl ApplicationAnswerRepository for MemoryTransaction {
    async fn save(&mut self, answer: &ApplicationAnswer) -> Result<()> {
        self.ensure_open()?;
        if !self
            .staged
            .applications
            .contains_key(&answer.application_id.0)
        {
            return Err(Error::ApplicationDoesNotExist);
        }
        let existing = self.staged.answers.iter_mut().find(|a| {
            a.application_id == answer.application_id && a.question == answer.question
        });
        match existing {
            Some(slot) => slot.text = answer.text.clone(),
            None => self.staged.answers.push(answer.clone()),
        }
        Ok(())
    }

    async fn delete_all_answers_by_application_id(&mut self, id: ApplicationId) -> Result<()> {
        self.ensure_open()?;
        self.staged.answers.retain(|a| a.application_id != id);
        Ok(())
    }
}

#[async_trait]
impl AdminProcessingApplicationRepository for MemoryTransaction {
    async fn get_by_admin_id(
        &mut self,
        admin_id: UserId,
    ) -> Result<Option<AdminProcessingApplication>> {
        self.ensure_open()?;
        Ok(self
            .staged
            .claims
            .iter()
            .find(|c| c.admin_id == admin_id)
            .cloned())
    }

    async fn create(
        &mut self,
        admin_id: UserId,
        application_id: ApplicationId,
    ) -> Result<AdminProcessingApplication> {
        self.ensure_open()?;
        if self.staged.claims.iter().any(|c| c.admin_id == admin_id) {
            return Err(Error::Conflict(Constraint::OpenClaimPerAdmin));
        }
        if self
            .staged
            .claims
            .iter()
            .any(|c| c.application_id == application_id)
        {
            return Err(Error::Conflict(Constraint::OpenClaimPerApplication));
        }
        self.staged.last_claim_id += 1;
        let claim = AdminProcessingApplication {
            id: ClaimId(self.staged.last_claim_id),
            admin_id,
            application_id,
        };
        self.staged.claims.push(claim.clone());
        Ok(claim)
    }

    async fn delete_by_application_id(
        &mut self,
        application_id: ApplicationId,
    ) -> Result<Option<AdminProcessingApplication>> {
        self.ensure_open()?;
        let idx = self
            .staged
            .claims
            .iter()
            .position(|c| c.application_id == application_id);
        Ok(idx.map(|i| self.staged.claims.remove(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ApplicationStatus, QuestionKey};

    fn new_user(id: i64) -> NewUser {
        NewUser {
            id: UserId(id),
            username: Some(format!("user{id}")),
            first_name: "Test".to_string(),
            last_name: None,
        }
    }

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        PathBuf::from(format!(
            "/tmp/{prefix}-{}-{ts}/store.json",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn commit_publishes_staged_changes() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.users().create(new_user(1)).await.unwrap();
        tx.commit().await.unwrap();
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.users().get_by_id(UserId(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rollback_and_drop_discard_changes() {
        let store = MemoryStore::new();
        let before = store.snapshot().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.users().create(new_user(1)).await.unwrap();
        tx.rollback().await.unwrap();
        drop(tx);

        {
            let mut tx = store.begin().await.unwrap();
            tx.users().create(new_user(2)).await.unwrap();
        }

        assert_eq!(store.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn finished_transaction_refuses_more_work() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.commit().await.unwrap();
        assert!(matches!(
            tx.users().get_by_id(UserId(1)).await,
            Err(Error::Storage(_))
        ));
        assert!(tx.commit().await.is_err());
    }

    #[tokio::test]
    async fn second_active_application_violates_constraint() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.users().create(new_user(1)).await.unwrap();
        tx.applications().create(UserId(1)).await.unwrap();
        match tx.applications().create(UserId(1)).await {
            Err(Error::Conflict(Constraint::ActiveApplicationPerUser)) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn claims_are_unique_per_admin_and_application() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let a = tx.applications().create(UserId(1)).await.unwrap();
        let b = tx.applications().create(UserId(2)).await.unwrap();

        tx.claims().create(UserId(100), a.id).await.unwrap();
        assert!(matches!(
            tx.claims().create(UserId(100), b.id).await,
            Err(Error::Conflict(Constraint::OpenClaimPerAdmin))
        ));
        assert!(matches!(
            tx.claims().create(UserId(200), a.id).await,
            Err(Error::Conflict(Constraint::OpenClaimPerApplication))
        ));

        let released = tx.claims().delete_by_application_id(a.id).await.unwrap();
        assert_eq!(released.map(|c| c.admin_id), Some(UserId(100)));
        tx.claims().create(UserId(100), b.id).await.unwrap();
    }

    #[tokio::test]
    async fn retrieve_last_prefers_newest_and_attaches_answers() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut first = tx.applications().create(UserId(1)).await.unwrap();
        first.status = ApplicationStatus::Rejected;
        tx.applications().update_status(&first).await.unwrap();

        let second = tx.applications().create(UserId(1)).await.unwrap();
        let answer = ApplicationAnswer {
            application_id: second.id,
            question: QuestionKey::new(2).unwrap(),
            text: "19".to_string(),
        };
        tx.answers().save(&answer).await.unwrap();

        let last = tx.applications().retrieve_last(UserId(1)).await.unwrap();
        assert_eq!(last.id, second.id);
        assert_eq!(last.answers.len(), 1);

        assert!(matches!(
            tx.applications().retrieve_last(UserId(2)).await,
            Err(Error::ApplicationDoesNotExist)
        ));
    }

    #[tokio::test]
    async fn snapshot_file_survives_reopen() {
        let path = tmp_file("recruit-store");
        let store = MemoryStore::open(&path).await.unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.users().create(new_user(5)).await.unwrap();
        let app = tx.applications().create(UserId(5)).await.unwrap();
        tx.commit().await.unwrap();
        drop(tx);

        let reopened = MemoryStore::open(&path).await.unwrap();
        let mut tx = reopened.begin().await.unwrap();
        assert!(tx.users().get_by_id(UserId(5)).await.unwrap().is_some());
        let mut last = tx.applications().retrieve_last(UserId(5)).await.unwrap();
        assert_eq!(last.id, app.id);

        // Id sequence is restored too.
        last.status = ApplicationStatus::Rejected;
        tx.applications().update_status(&last).await.unwrap();
        let next = tx.applications().create(UserId(5)).await.unwrap();
        assert_ne!(next.id, app.id);
        drop(tx);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

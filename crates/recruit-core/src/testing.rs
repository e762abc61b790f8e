//! Seeding helpers and fakes shared by service tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    domain::{
        AdminProcessingApplication, Application, ApplicationAnswer, ApplicationId,
        ApplicationStatus, ChatId, MessageId, MessageRef, NewUser, QuestionKey, User, UserId,
    },
    messaging::port::MessagingPort,
    ports::UnitOfWork,
    storage::MemoryStore,
    Result,
};

pub(crate) fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub(crate) fn new_user(id: i64) -> NewUser {
    NewUser {
        id: UserId(id),
        username: Some(format!("player{id}")),
        first_name: "Player".to_string(),
        last_name: None,
    }
}

pub(crate) async fn seed_user(store: &MemoryStore, id: i64, banned: bool) -> User {
    let mut tx = store.begin().await.unwrap();
    let mut user = tx.users().create(new_user(id)).await.unwrap();
    if banned {
        user.is_banned = true;
        tx.users().update(&user).await.unwrap();
    }
    tx.commit().await.unwrap();
    user
}

/// Insert an application for `user` already in `status`, with all answers filled in
/// for anything past IN_PROGRESS.
pub(crate) async fn seed_application(
    store: &MemoryStore,
    user: i64,
    status: ApplicationStatus,
    decision_date: Option<DateTime<Utc>>,
) -> Application {
    let mut tx = store.begin().await.unwrap();
    let mut app = tx.applications().create(UserId(user)).await.unwrap();
    if status != ApplicationStatus::InProgress {
        for key in QuestionKey::all() {
            let answer = ApplicationAnswer {
                application_id: app.id,
                question: key,
                text: format!("answer {key}"),
            };
            tx.answers().save(&answer).await.unwrap();
        }
    }
    app.status = status;
    app.decision_date = decision_date;
    tx.applications().update_status(&app).await.unwrap();
    let app = tx.applications().get_by_id(app.id).await.unwrap();
    tx.commit().await.unwrap();
    app
}

pub(crate) async fn save_answer(store: &MemoryStore, application_id: ApplicationId, key: u8) {
    let mut tx = store.begin().await.unwrap();
    let answer = ApplicationAnswer {
        application_id,
        question: QuestionKey::new(key).unwrap(),
        text: format!("answer {key}"),
    };
    tx.answers().save(&answer).await.unwrap();
    tx.commit().await.unwrap();
}

pub(crate) async fn load(store: &MemoryStore, id: ApplicationId) -> Application {
    let mut tx = store.begin().await.unwrap();
    tx.applications().get_by_id(id).await.unwrap()
}

pub(crate) async fn load_user(store: &MemoryStore, id: i64) -> User {
    let mut tx = store.begin().await.unwrap();
    tx.users().get_by_id(UserId(id)).await.unwrap().unwrap()
}

pub(crate) async fn claim_of(store: &MemoryStore, admin: i64) -> Option<AdminProcessingApplication> {
    let mut tx = store.begin().await.unwrap();
    tx.claims().get_by_admin_id(UserId(admin)).await.unwrap()
}

/// Records every outbound call instead of talking to Telegram.
#[derive(Default)]
pub(crate) struct FakeMessenger {
    pub sends: Mutex<Vec<(ChatId, String)>>,
    pub revoked: Mutex<Vec<(ChatId, String)>>,
    pub created_links: Mutex<u32>,
}

impl FakeMessenger {
    fn message_ref(&self, chat_id: ChatId) -> MessageRef {
        let n = self.sends.lock().unwrap().len();
        MessageRef {
            chat_id,
            message_id: MessageId(n as i32),
        }
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.sends.lock().unwrap().push((chat_id, text.to_string()));
        Ok(self.message_ref(chat_id))
    }

    async fn send_markdown(&self, chat_id: ChatId, markdown: &str) -> Result<MessageRef> {
        self.sends
            .lock()
            .unwrap()
            .push((chat_id, markdown.to_string()));
        Ok(self.message_ref(chat_id))
    }

    async fn create_invite_link(&self, _chat_id: ChatId) -> Result<String> {
        let mut n = self.created_links.lock().unwrap();
        *n += 1;
        Ok(format!("https://t.me/+invite{n}"))
    }

    async fn revoke_invite_link(&self, chat_id: ChatId, invite_link: &str) -> Result<()> {
        self.revoked
            .lock()
            .unwrap()
            .push((chat_id, invite_link.to_string()));
        Ok(())
    }
}

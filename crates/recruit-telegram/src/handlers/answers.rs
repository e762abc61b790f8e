use teloxide::{prelude::*, types::Message};

use recruit_core::{
    domain::{Application, ChatId, QuestionKey, UserId},
    formatting::{escape_markdown, question_prompt, render_application},
};

use super::{replies, reply};
use crate::router::AppState;

pub async fn handle_answer(msg: &Message, text: &str, state: &AppState) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = UserId(user.id.0 as i64);
    let chat_id = ChatId(msg.chat.id.0);
    let services = &state.services;

    let progress = match services.answers.answer_next(user_id, text).await {
        Ok(progress) => progress,
        Err(e) => {
            let text = replies::answer_error(&e, &state.cfg.manager_contact);
            reply(state, chat_id, &text).await;
            return Ok(());
        }
    };

    if progress.submitted {
        reply(
            state,
            chat_id,
            "Thank you! Your application has been sent to the admins.",
        )
        .await;
        notify_admins(state, &progress.application).await;
    } else if let Some(next) = progress.next {
        reply(state, chat_id, question_prompt(next)).await;
    }
    Ok(())
}

/// Announce a submitted application. Falls back to plain text when Telegram refuses
/// the MarkdownV2 report, so the admins always learn about it.
async fn notify_admins(state: &AppState, application: &Application) {
    let admin_chat = ChatId(state.cfg.admin_chat_id);
    let report = format!(
        "{}\n{}",
        render_application(application),
        escape_markdown(&take_hint(application))
    );
    let Err(e) = state.messenger.send_markdown(admin_chat, &report).await else {
        return;
    };
    tracing::warn!(
        application = application.id.0,
        error = %e,
        "markdown report rejected, sending plain text"
    );

    let plain = format!("New application №{}. {}", application.id, take_hint(application));
    if let Err(e) = state.messenger.send_text(admin_chat, &plain).await {
        tracing::error!(
            application = application.id.0,
            error = %e,
            "admins were not notified about a submitted application"
        );
    }
}

fn take_hint(application: &Application) -> String {
    format!("Send /take {} to review it.", application.id)
}

/// Prompt for the first question of a fresh form.
pub fn first_prompt() -> &'static str {
    QuestionKey::all()
        .next()
        .map(question_prompt)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use recruit_core::{
        config::Config,
        domain::{ApplicationId, MessageId, MessageRef},
        errors::Error,
        messaging::port::MessagingPort,
        storage::MemoryStore,
        Result,
    };

    use super::*;
    use crate::router::{ChatLocks, Services};

    /// Telegram stand-in that refuses every MarkdownV2 message.
    #[derive(Default)]
    struct MarkdownRefusingMessenger {
        texts: Mutex<Vec<(ChatId, String)>>,
    }

    #[async_trait]
    impl MessagingPort for MarkdownRefusingMessenger {
        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            self.texts.lock().unwrap().push((chat_id, text.to_string()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }

        async fn send_markdown(&self, _chat_id: ChatId, _markdown: &str) -> Result<MessageRef> {
            Err(Error::External("Bad Request: message is too long".to_string()))
        }

        async fn create_invite_link(&self, _chat_id: ChatId) -> Result<String> {
            Ok("https://t.me/+unused".to_string())
        }

        async fn revoke_invite_link(&self, _chat_id: ChatId, _invite_link: &str) -> Result<()> {
            Ok(())
        }
    }

    fn state_with(messenger: Arc<dyn MessagingPort>) -> AppState {
        let cfg = Config {
            telegram_bot_token: "token".to_string(),
            admin_ids: vec![100],
            admin_chat_id: -500,
            clan_chat_id: -600,
            reapply_cooldown: Duration::days(30),
            store_file: None,
            manager_contact: "@manager".to_string(),
        };
        let services = Services::new(&cfg, Arc::new(MemoryStore::new()), messenger.clone());
        AppState {
            cfg: Arc::new(cfg),
            messenger,
            services: Arc::new(services),
            chat_locks: Arc::new(ChatLocks::default()),
        }
    }

    #[tokio::test]
    async fn refused_report_falls_back_to_plain_text() {
        let messenger = Arc::new(MarkdownRefusingMessenger::default());
        let state = state_with(messenger.clone());
        let app = Application::new(ApplicationId(9), UserId(1), Utc::now());

        notify_admins(&state, &app).await;

        assert_eq!(
            *messenger.texts.lock().unwrap(),
            vec![(
                ChatId(-500),
                "New application №9. Send /take 9 to review it.".to_string()
            )]
        );
    }

    #[test]
    fn take_hint_names_the_command() {
        let app = Application::new(ApplicationId(12), UserId(1), Utc::now());
        assert_eq!(take_hint(&app), "Send /take 12 to review it.");
        assert_eq!(escape_markdown(&take_hint(&app)), r"Send /take 12 to review it\.");
    }

    #[test]
    fn first_prompt_asks_for_the_first_question() {
        assert_eq!(
            first_prompt(),
            question_prompt(QuestionKey::new(1).unwrap())
        );
    }
}

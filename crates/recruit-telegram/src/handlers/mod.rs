//! Telegram update handlers.
//!
//! Each handler is a thin adapter: it turns the update into a core service call and
//! the outcome (or domain error) into a reply.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use recruit_core::domain::ChatId;

use crate::router::AppState;

mod answers;
mod commands;
mod members;
mod replies;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if let Some(joined) = msg.new_chat_members() {
        if msg.chat.id.0 == state.cfg.clan_chat_id {
            members::handle_new_members(joined, &state).await;
        }
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    if text.starts_with('/') {
        return commands::handle_command(&msg, text, &state).await;
    }

    if msg.chat.is_private() {
        // Answers from one applicant are recorded one at a time.
        let _guard = state.chat_locks.lock_chat(msg.chat.id.0).await;
        return answers::handle_answer(&msg, text, &state).await;
    }

    Ok(())
}

/// Best-effort send; a failed reply is logged and swallowed.
pub(crate) async fn reply(state: &AppState, chat_id: ChatId, text: &str) {
    if let Err(e) = state.messenger.send_text(chat_id, text).await {
        tracing::warn!(chat = chat_id.0, error = %e, "failed to send reply");
    }
}

pub(crate) async fn reply_markdown(state: &AppState, chat_id: ChatId, markdown: &str) {
    if let Err(e) = state.messenger.send_markdown(chat_id, markdown).await {
        tracing::warn!(chat = chat_id.0, error = %e, "failed to send markdown reply");
    }
}

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Cross-messenger port.
///
/// Core services only send text and manage invite links; keyboards and conversation
/// state stay in the adapter.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Send pre-escaped MarkdownV2.
    async fn send_markdown(&self, chat_id: ChatId, markdown: &str) -> Result<MessageRef>;

    /// Single-use invite link into `chat_id`.
    async fn create_invite_link(&self, chat_id: ChatId) -> Result<String>;

    async fn revoke_invite_link(&self, chat_id: ChatId, invite_link: &str) -> Result<()>;
}

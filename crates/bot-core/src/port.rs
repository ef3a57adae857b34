//! Outbound chat surface the router drives.
//!
//! One implementation per messenger. Everything the conversation logic
//! needs from the platform goes through this trait so the router can be
//! exercised against a fake in tests.

use async_trait::async_trait;

use crate::error::BotResult;

/// Which reply keyboard to attach to an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave the current keyboard untouched.
    None,
    /// Single "Log in" button for unauthenticated chats.
    Login,
    /// Feed categories plus Settings.
    Main,
    /// Back and Log out.
    Settings,
    /// Remove the reply keyboard entirely.
    Remove,
}

/// Handle to a message the bot sent, for later reference or deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Keyboard) -> BotResult<MessageRef>;

    /// Send `text` quoting an earlier message in the chat.
    async fn reply(
        &self,
        chat_id: i64,
        reply_to: i64,
        text: &str,
        keyboard: Keyboard,
    ) -> BotResult<MessageRef>;

    /// Render a photo with a caption and an inline row of post actions
    /// plus an "open" link.
    async fn send_photo(
        &self,
        chat_id: i64,
        image_url: &str,
        caption: &str,
        open_url: &str,
    ) -> BotResult<MessageRef>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> BotResult<()>;

    /// Fetch the text of an earlier message in the chat, if the platform
    /// still has it. Used to re-read the stored posting key message.
    async fn recall_message_text(&self, chat_id: i64, message_id: i64)
        -> BotResult<Option<String>>;

    /// Acknowledge a callback, optionally as a popup alert.
    async fn notify_callback(&self, callback_id: &str, text: &str, alert: bool) -> BotResult<()>;

    /// Download the bytes of an uploaded photo.
    async fn download_image(&self, file_id: &str) -> BotResult<Vec<u8>>;
}

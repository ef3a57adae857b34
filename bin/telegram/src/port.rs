//! Telegram implementation of the conversation core's chat port.

use async_trait::async_trait;
use photon_bot_core::{BotError, BotResult, ChatPort, Keyboard, MessageRef};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ReplyParameters};

use crate::keyboards;

#[derive(Clone)]
pub struct TelegramPort {
    bot: Bot,
}

impl TelegramPort {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn platform(e: impl std::fmt::Display) -> BotError {
    BotError::Platform(e.to_string())
}

fn message_ref(message: &Message) -> MessageRef {
    MessageRef {
        chat_id: message.chat.id.0,
        message_id: message.id.0 as i64,
    }
}

#[async_trait]
impl ChatPort for TelegramPort {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Keyboard) -> BotResult<MessageRef> {
        let request = self.bot.send_message(ChatId(chat_id), text);
        let message = match keyboards::reply_markup(keyboard) {
            Some(markup) => request.reply_markup(markup).await,
            None => request.await,
        }
        .map_err(platform)?;
        Ok(message_ref(&message))
    }

    async fn reply(
        &self,
        chat_id: i64,
        reply_to: i64,
        text: &str,
        keyboard: Keyboard,
    ) -> BotResult<MessageRef> {
        let request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .reply_parameters(ReplyParameters::new(MessageId(reply_to as i32)));
        let message = match keyboards::reply_markup(keyboard) {
            Some(markup) => request.reply_markup(markup).await,
            None => request.await,
        }
        .map_err(platform)?;
        Ok(message_ref(&message))
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        image_url: &str,
        caption: &str,
        open_url: &str,
    ) -> BotResult<MessageRef> {
        let url = image_url
            .parse()
            .map_err(|e| BotError::Platform(format!("bad image url {image_url}: {e}")))?;
        let message = self
            .bot
            .send_photo(ChatId(chat_id), InputFile::url(url))
            .caption(caption)
            .reply_markup(keyboards::post_actions(open_url))
            .await
            .map_err(platform)?;
        Ok(message_ref(&message))
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> BotResult<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id as i32))
            .await
            .map_err(platform)?;
        Ok(())
    }

    /// Telegram has no message-fetch call, but replying to a message
    /// echoes the quoted original in the response. Send a throwaway
    /// reply to the target, read the quote, delete the probe.
    async fn recall_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> BotResult<Option<String>> {
        let probe = self
            .bot
            .send_message(ChatId(chat_id), "\u{2026}")
            .reply_parameters(ReplyParameters::new(MessageId(message_id as i32)))
            .await;
        let probe = match probe {
            Ok(probe) => probe,
            // The target message is gone, nothing to recall.
            Err(_) => return Ok(None),
        };
        let text = probe
            .reply_to_message()
            .and_then(|quoted| quoted.text())
            .map(str::to_string);
        if let Err(e) = self.bot.delete_message(ChatId(chat_id), probe.id).await {
            tracing::warn!("Failed to delete recall probe in chat {}: {}", chat_id, e);
        }
        Ok(text)
    }

    async fn notify_callback(&self, callback_id: &str, text: &str, alert: bool) -> BotResult<()> {
        let mut request = self.bot.answer_callback_query(callback_id.to_string());
        if !text.is_empty() {
            request = request.text(text.to_string());
        }
        if alert {
            request = request.show_alert(true);
        }
        request.await.map_err(platform)?;
        Ok(())
    }

    async fn download_image(&self, file_id: &str) -> BotResult<Vec<u8>> {
        let file = self
            .bot
            .get_file(file_id.to_string())
            .await
            .map_err(platform)?;
        let mut buffer = Vec::new();
        self.bot
            .download_file(&file.path, &mut buffer)
            .await
            .map_err(platform)?;
        Ok(buffer)
    }
}

//! Translation from Telegram updates to the platform-neutral events the
//! conversation core consumes.
//!
//! Chat text is passed through raw; the router decides whether a pending
//! continuation claims it before matching commands and menu labels.

use photon_bot_core::{CallbackAction, EventMeta, InboundEvent};
use teloxide::types::{CallbackQuery, Message};

use crate::keyboards::{CB_COMMENT, CB_UPVOTE};

/// Classify a chat message. Returns `None` for updates the bot ignores,
/// like messages without a sender or with no usable content.
pub fn classify_message(msg: &Message) -> Option<(EventMeta, InboundEvent)> {
    let from = msg.from.as_ref()?;
    let meta = EventMeta {
        user_id: from.id.0 as i64,
        chat_id: msg.chat.id.0,
        message_id: msg.id.0 as i64,
        locale: from.language_code.clone(),
        callback_id: None,
    };

    if let Some(sizes) = msg.photo() {
        // Telegram sends several downscaled variants; post the largest.
        let largest = sizes.iter().max_by_key(|p| p.file.size)?;
        return Some((
            meta,
            InboundEvent::Photo {
                file_id: largest.file.id.clone(),
                caption: msg.caption().map(str::to_string),
            },
        ));
    }

    let text = msg.text()?;
    Some((meta, InboundEvent::Text(text.to_string())))
}

/// Classify an inline button press. The carrying message must still be
/// accessible, its id is the key into the post-reference store.
pub fn classify_callback(query: &CallbackQuery) -> Option<(EventMeta, InboundEvent)> {
    let message = query.message.as_ref()?.regular_message()?;
    let action = match query.data.as_deref()? {
        CB_UPVOTE => CallbackAction::Upvote,
        CB_COMMENT => CallbackAction::Comment,
        _ => return None,
    };
    let meta = EventMeta {
        user_id: query.from.id.0 as i64,
        chat_id: message.chat.id.0,
        message_id: message.id.0 as i64,
        locale: query.from.language_code.clone(),
        callback_id: Some(query.id.clone()),
    };
    Some((meta, InboundEvent::Callback(action)))
}

//! Keyboard construction. Button labels come from the conversation core,
//! which matches inbound text against them.

use photon_bot_core::{
    BTN_BACK, BTN_FEED, BTN_HOT, BTN_LOGIN, BTN_LOGOUT, BTN_NEW, BTN_SETTINGS, BTN_TOP, Keyboard,
};
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ReplyMarkup,
};

pub const CB_UPVOTE: &str = "post:upvote";
pub const CB_COMMENT: &str = "post:comment";

pub fn reply_markup(keyboard: Keyboard) -> Option<ReplyMarkup> {
    match keyboard {
        Keyboard::None => None,
        Keyboard::Login => Some(persistent(vec![vec![BTN_LOGIN]])),
        Keyboard::Main => Some(persistent(vec![
            vec![BTN_FEED, BTN_NEW],
            vec![BTN_HOT, BTN_TOP],
            vec![BTN_SETTINGS],
        ])),
        Keyboard::Settings => Some(persistent(vec![vec![BTN_BACK, BTN_LOGOUT]])),
        Keyboard::Remove => Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new())),
    }
}

fn persistent(rows: Vec<Vec<&str>>) -> ReplyMarkup {
    let rows = rows
        .into_iter()
        .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>());
    ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard())
}

/// Inline actions under a rendered feed post.
pub fn post_actions(open_url: &str) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![
        InlineKeyboardButton::callback("Upvote", CB_UPVOTE),
        InlineKeyboardButton::callback("Comment", CB_COMMENT),
    ]];
    if let Ok(url) = open_url.parse() {
        rows.push(vec![InlineKeyboardButton::url("Open in Photon", url)]);
    }
    InlineKeyboardMarkup::new(rows)
}

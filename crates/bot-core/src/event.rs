//! Platform-neutral inbound events.
//!
//! The platform adapter translates raw updates into these shapes before
//! handing them to the router, which keeps the conversation logic free
//! of any messenger SDK types.

use photon_api::FeedCategory;

/// Who sent what, and where, for a single update.
#[derive(Debug, Clone)]
pub struct EventMeta {
    pub user_id: i64,
    pub chat_id: i64,
    pub message_id: i64,
    /// IETF language tag reported by the client, if any.
    pub locale: Option<String>,
    /// Set for callback events so the router can acknowledge them.
    pub callback_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
}

/// A tap on the persistent reply keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    LogIn,
    Feed(FeedCategory),
    Settings,
    Back,
    LogOut,
}

/// A tap on an inline button under a rendered post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Upvote,
    Comment,
}

#[derive(Debug, Clone)]
pub enum InboundEvent {
    Command(Command),
    Menu(MenuAction),
    /// Raw chat text. A pending continuation claims it before any
    /// command or menu-label matching; otherwise the router classifies
    /// it with [`classify_text`].
    Text(String),
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    Callback(CallbackAction),
}

/// Reply-keyboard button labels. The router matches chat text against
/// these, so front ends must render exactly these strings.
pub const BTN_LOGIN: &str = "Log in";
pub const BTN_FEED: &str = "Feed";
pub const BTN_NEW: &str = "New";
pub const BTN_HOT: &str = "Hot";
pub const BTN_TOP: &str = "Top";
pub const BTN_SETTINGS: &str = "Settings";
pub const BTN_BACK: &str = "Back";
pub const BTN_LOGOUT: &str = "Log out";

/// Classify chat text that no pending continuation has claimed.
pub fn classify_text(text: &str) -> InboundEvent {
    match text.trim() {
        "/start" => InboundEvent::Command(Command::Start),
        "/help" => InboundEvent::Command(Command::Help),
        BTN_LOGIN => InboundEvent::Menu(MenuAction::LogIn),
        BTN_FEED => InboundEvent::Menu(MenuAction::Feed(FeedCategory::Feed)),
        BTN_NEW => InboundEvent::Menu(MenuAction::Feed(FeedCategory::New)),
        BTN_HOT => InboundEvent::Menu(MenuAction::Feed(FeedCategory::Hot)),
        BTN_TOP => InboundEvent::Menu(MenuAction::Feed(FeedCategory::Top)),
        BTN_SETTINGS => InboundEvent::Menu(MenuAction::Settings),
        BTN_BACK => InboundEvent::Menu(MenuAction::Back),
        BTN_LOGOUT => InboundEvent::Menu(MenuAction::LogOut),
        _ => InboundEvent::Text(text.to_string()),
    }
}

//! Platform-agnostic conversation core for the Photon bot.
//!
//! This crate provides:
//! - Tagged inbound-event classification and the conversation router
//! - The authentication guard and the login sub-flow
//! - sqlx-backed identity, post-reference, and continuation stores
//! - The user-visible message catalogue and hashtag extraction
//!
//! Platform front ends (Telegram today) implement [`ChatPort`] and feed
//! classified events into [`BotApp::handle_event`].

pub mod content;
pub mod continuation;
pub mod db;
pub mod error;
pub mod event;
pub mod identity;
pub mod messages;
pub mod port;
pub mod posts;
pub mod router;

pub use content::{construct_identifier, parse_hashtags, resolve_identifier};
pub use continuation::{Continuation, ContinuationStore};
pub use error::{BotError, BotResult};
pub use event::{
    BTN_BACK, BTN_FEED, BTN_HOT, BTN_LOGIN, BTN_LOGOUT, BTN_NEW, BTN_SETTINGS, BTN_TOP,
    CallbackAction, Command, EventMeta, InboundEvent, MenuAction, classify_text,
};
pub use identity::{IdentityStore, UserRecord};
pub use messages::MsgKey;
pub use port::{ChatPort, Keyboard, MessageRef};
pub use posts::{PostRef, PostStore};
pub use router::{AppOptions, BotApp};

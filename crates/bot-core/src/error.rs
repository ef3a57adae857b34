//! Error types for the conversation core.

use thiserror::Error;

/// Result type for bot operations.
pub type BotResult<T> = Result<T, BotError>;

/// Errors that can escape a handler. Expected domain outcomes
/// (invalid key, missing post, empty feed) are converted to user notices
/// before they get here; these are the failures the dispatcher logs.
#[derive(Debug, Error)]
pub enum BotError {
    /// Store access failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The chat platform rejected or failed an outbound action.
    #[error("platform error: {0}")]
    Platform(String),

    /// A stored record failed to decode.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

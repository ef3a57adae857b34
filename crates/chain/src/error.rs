use thiserror::Error;

/// Domain outcomes of gateway operations.
///
/// `InvalidCredential` deliberately swallows its cause: malformed key,
/// signature mismatch, and node failures during verification are all the
/// same thing to the login flow.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("failed to authenticate with this key")]
    InvalidCredential,

    #[error("account is not signed in: {0}")]
    NotAuthenticated(String),

    #[error("post not found: {0}")]
    PostNotFound(String),

    #[error("already voted in a similar way on {0}")]
    AlreadyVoted(String),

    #[error("chain error: {0}")]
    Rpc(String),
}

use thiserror::Error;

/// Errors surfaced by the photo API collaborator.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network/HTTP failure talking to the API.
    #[error("photo api unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The prepare endpoint rejected the submission with field errors.
    #[error("submission rejected: {0}")]
    Validation(String),
}

//! Speech-to-text error types.

use thiserror::Error;

/// Speech-to-text operation errors.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for speech-to-text operations.
pub type TranscribeResult<T> = std::result::Result<T, TranscribeError>;

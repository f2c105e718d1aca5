//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid track id: {0}")]
    InvalidTrackId(String),

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("invalid transcription state: {0}")]
    InvalidTranscriptionState(String),

    #[error("invalid storage pointer: {0}")]
    InvalidStoragePointer(String),

    #[error("invalid chunk count: {count} (must be between 1 and {max})")]
    InvalidChunkCount { count: u32, max: u32 },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

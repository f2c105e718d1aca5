//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("signed URLs unsupported by the {0} backend")]
    SignedUrlsUnsupported(&'static str),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Whether this error indicates a credential/authorization fault rather
    /// than a per-object problem. Repeated auth faults latch the cloud path
    /// into degraded mode.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AccessDenied(_) | Self::Config(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

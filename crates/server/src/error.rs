//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("upload session not found: {0}")]
    SessionNotFound(String),

    #[error("incomplete upload: missing chunk index {missing_index}")]
    IncompleteUpload { missing_index: u32 },

    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("cloud storage is not available")]
    StorageUnavailable,

    #[error("cloud object unreadable: {0}")]
    ObjectUnreadable(String),

    #[error("no speech-to-text capability is configured")]
    TranscriptionUnavailable,

    #[error("requested range not satisfiable: {0}")]
    RangeNotSatisfiable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] soundpost_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] soundpost_metadata::MetadataError),

    #[error("core error: {0}")]
    Core(#[from] soundpost_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::SessionNotFound(_) => "session_not_found",
            Self::IncompleteUpload { .. } => "incomplete_upload",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::StorageUnavailable => "storage_unavailable",
            Self::ObjectUnreadable(_) => "object_unreadable",
            Self::TranscriptionUnavailable => "transcription_unavailable",
            Self::RangeNotSatisfiable(_) => "range_not_satisfiable",
            Self::Internal(_) => "internal_error",
            Self::Storage(_) => "storage_error",
            Self::Metadata(_) => "metadata_error",
            Self::Core(_) => "bad_request",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::IncompleteUpload { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ObjectUnreadable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::TranscriptionUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::RangeNotSatisfiable(_) => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => match e {
                soundpost_storage::StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(e) => match e {
                soundpost_metadata::MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                soundpost_metadata::MetadataError::InvalidStateTransition { .. } => {
                    StatusCode::CONFLICT
                }
                soundpost_metadata::MetadataError::Constraint(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// The message sent to clients. Backing-store failures are reported with
    /// a generic message so internal storage detail never leaks.
    fn client_message(&self) -> String {
        match self {
            Self::Storage(soundpost_storage::StorageError::NotFound(_)) => {
                "object not found".to_string()
            }
            Self::Storage(_) => "storage backend error".to_string(),
            Self::ObjectUnreadable(_) => "cloud object unreadable".to_string(),
            Self::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_do_not_leak_detail() {
        let err = ApiError::Storage(soundpost_storage::StorageError::Config(
            "secret endpoint http://internal:9000".to_string(),
        ));
        assert_eq!(err.client_message(), "storage backend error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_incomplete_upload_names_missing_index() {
        let err = ApiError::IncompleteUpload { missing_index: 2 };
        assert!(err.to_string().contains("index 2"));
        assert_eq!(err.code(), "incomplete_upload");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}

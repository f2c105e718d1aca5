//! Presigned and server-mediated upload handlers.

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode, header};
use serde::{Deserialize, Serialize};

/// Descriptor of one file a client wants to upload directly to the bucket.
#[derive(Debug, Deserialize)]
pub struct SignUploadRequest {
    pub filename: String,
    pub content_type: String,
    /// Declared size in bytes; informational.
    #[serde(default)]
    pub size: Option<u64>,
}

/// A presigned upload grant.
#[derive(Debug, Serialize)]
pub struct SignUploadResponse {
    /// Object key to submit back via the from-key create.
    pub key: String,
    /// Time-limited PUT URL.
    pub url: String,
    pub expires_in_secs: u64,
}

fn validate_sign_request(req: &SignUploadRequest) -> ApiResult<()> {
    if req.filename.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "filename must not be empty".to_string(),
        ));
    }
    if req.content_type.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "content_type must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// POST /v1/uploads/sign - Presign a direct client→bucket upload.
pub async fn sign_upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<SignUploadRequest>,
) -> ApiResult<Json<SignUploadResponse>> {
    validate_sign_request(&req)?;

    let (key, url) = state
        .facade
        .signed_put_url(user.user_id, &req.filename, &req.content_type)
        .await?;

    Ok(Json(SignUploadResponse {
        key,
        url,
        expires_in_secs: state.config.server.signed_url_ttl_secs,
    }))
}

/// Batch presign request.
#[derive(Debug, Deserialize)]
pub struct SignUploadBatchRequest {
    pub files: Vec<SignUploadRequest>,
}

/// POST /v1/uploads/sign/batch - Presign several uploads for bulk import.
pub async fn sign_upload_batch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<SignUploadBatchRequest>,
) -> ApiResult<Json<Vec<SignUploadResponse>>> {
    let limit = state.config.server.batch_sign_limit;
    if req.files.is_empty() {
        return Err(ApiError::BadRequest("files must not be empty".to_string()));
    }
    if req.files.len() > limit {
        return Err(ApiError::BadRequest(format!(
            "batch of {} files exceeds the limit of {limit}",
            req.files.len()
        )));
    }

    let mut grants = Vec::with_capacity(req.files.len());
    for file in &req.files {
        validate_sign_request(file)?;
        let (key, url) = state
            .facade
            .signed_put_url(user.user_id, &file.filename, &file.content_type)
            .await?;
        grants.push(SignUploadResponse {
            key,
            url,
            expires_in_secs: state.config.server.signed_url_ttl_secs,
        });
    }

    Ok(Json(grants))
}

/// Proxy upload response.
#[derive(Debug, Serialize)]
pub struct ProxyUploadResponse {
    pub key: String,
}

/// POST /v1/uploads/proxy - Server-mediated upload.
///
/// Exists for clients whose browsers cannot PUT to the bucket origin
/// directly (cross-origin restrictions). The raw body is the file; the
/// filename rides in the `x-file-name` header.
pub async fn proxy_upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ProxyUploadResponse>)> {
    let filename = headers
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("x-file-name header is required".to_string()))?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    if body.is_empty() {
        return Err(ApiError::BadRequest("request body is empty".to_string()));
    }

    let key = state
        .facade
        .proxy_put(user.user_id, filename, content_type, body)
        .await?;

    tracing::info!(%key, "proxied upload to cloud storage");
    Ok((StatusCode::CREATED, Json(ProxyUploadResponse { key })))
}

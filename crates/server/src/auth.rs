//! Authentication middleware and credential verification.
//!
//! The account layer provisions bearer tokens; this subsystem only verifies
//! them. Streaming handlers also accept the credential as a query parameter
//! because native media-playback elements cannot attach custom headers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Authenticated request extension.
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser {
    /// Owner identity every operation is scoped to.
    pub user_id: Uuid,
    /// The verified token's ID.
    pub token_id: Uuid,
}

/// Hash a raw bearer value for storage lookup.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Extract bearer token from the Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(&v[7..])
            } else {
                None
            }
        })
}

/// Verify a raw credential against the token store.
pub async fn authenticate_credential(
    state: &AppState,
    raw_token: &str,
) -> ApiResult<AuthenticatedUser> {
    let token_hash = hash_token(raw_token);
    let token = state
        .metadata
        .get_token_by_hash(&token_hash)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("unknown token".to_string()))?;

    if token.revoked_at.is_some() {
        return Err(ApiError::Unauthorized("token revoked".to_string()));
    }

    Ok(AuthenticatedUser {
        user_id: token.user_id,
        token_id: token.token_id,
    })
}

/// Authenticate from headers, falling back to a `token` query value.
/// Streaming handlers call this directly instead of going through the
/// middleware.
pub async fn authenticate_request(
    state: &AppState,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> ApiResult<AuthenticatedUser> {
    let raw = extract_bearer_token(headers)
        .or(query_token)
        .ok_or_else(|| ApiError::Unauthorized("missing credential".to_string()))?;
    authenticate_credential(state, raw).await
}

/// Middleware validating the bearer token and attaching
/// [`AuthenticatedUser`] as a request extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let raw = extract_bearer_token(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?
        .to_string();

    let user = authenticate_credential(&state, &raw).await?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

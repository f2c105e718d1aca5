//! Shared handler utilities and the health endpoint.

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use serde::Serialize;
use soundpost_metadata::models::TrackRow;
use uuid::Uuid;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /v1/health - Unauthenticated health check for load balancers.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Fetch a track scoped to the caller. Absent-or-foreign tracks are an
/// identical 404 so existence is never revealed to non-owners.
pub(crate) async fn fetch_owned_track(
    state: &AppState,
    user: &AuthenticatedUser,
    track_id: Uuid,
) -> ApiResult<TrackRow> {
    state
        .metadata
        .get_track_for_owner(track_id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("track {track_id}")))
}

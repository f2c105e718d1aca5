//! Metadata hygiene and integrity reconciliation handlers.

use crate::auth::AuthenticatedUser;
use crate::error::ApiResult;
use crate::metrics::{CLOUD_OBJECTS_PROBED, ORPHANED_TRACKS_DELETED};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Extension, State};
use serde::Serialize;
use soundpost_metadata::models::RemovedTrack;

/// Missing-audio cleanup response.
#[derive(Debug, Serialize)]
pub struct PurgeMissingAudioResponse {
    pub deleted: usize,
    pub removed: Vec<RemovedTrack>,
}

/// POST /v1/cleanup/missing-audio - Delete the caller's tracks that carry
/// neither storage pointer (abandoned chunked-upload pre-creations).
pub async fn purge_missing_audio(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<PurgeMissingAudioResponse>> {
    let removed = state
        .metadata
        .delete_tracks_missing_audio(user.user_id)
        .await?;

    if !removed.is_empty() {
        tracing::info!(deleted = removed.len(), "purged tracks without audio");
    }

    Ok(Json(PurgeMissingAudioResponse {
        deleted: removed.len(),
        removed,
    }))
}

/// Integrity reconciliation response.
#[derive(Debug, Serialize)]
pub struct VerifyObjectsResponse {
    /// Cloud-backed tracks probed.
    pub checked: usize,
    /// Rows deleted because their object failed the probe.
    pub deleted: u64,
    /// Identities of the deleted rows, for client-side cache reconciliation.
    pub removed: Vec<RemovedTrack>,
}

/// POST /v1/cleanup/verify-objects - Verify that every cloud object backing
/// the caller's tracks is actually readable, and delete rows whose object
/// is gone.
///
/// Each verification is a genuine short-range byte fetch, not a metadata
/// check. An unconfigured cloud backend makes this a no-op reporting zero
/// checked and zero deleted; storage absence is a valid deployment state,
/// not a fault.
pub async fn verify_cloud_objects(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<VerifyObjectsResponse>> {
    if !state.facade.cloud_available() {
        return Ok(Json(VerifyObjectsResponse {
            checked: 0,
            deleted: 0,
            removed: Vec::new(),
        }));
    }

    let tracks = state.metadata.list_cloud_tracks(user.user_id).await?;
    let checked = tracks.len();

    let mut orphaned = Vec::new();
    for track in tracks {
        CLOUD_OBJECTS_PROBED.inc();
        if !state.facade.probe_readable(&track.object_key).await {
            tracing::warn!(
                track_id = %track.track_id,
                key = %track.object_key,
                "cloud object failed readability probe"
            );
            orphaned.push(RemovedTrack {
                track_id: track.track_id,
                title: track.title,
            });
        }
    }

    let ids: Vec<_> = orphaned.iter().map(|t| t.track_id).collect();
    let deleted = state.metadata.delete_tracks_by_id(&ids).await?;
    ORPHANED_TRACKS_DELETED.inc_by(deleted);

    if deleted > 0 {
        tracing::info!(checked, deleted, "reconciled orphaned cloud tracks");
    }

    Ok(Json(VerifyObjectsResponse {
        checked,
        deleted,
        removed: orphaned,
    }))
}

//! Track ingestion and CRUD handlers.
//!
//! Three creation entry points share one post-condition: a persisted track
//! row whose storage pointer names exactly one backing location. The third
//! entry point (chunked) lives in the chunked module and converges on the
//! inline path at finalize.

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::fetch_owned_track;
use crate::metrics::TRACKS_CREATED;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use soundpost_core::track::{StoragePointer, TrackMetadata};
use soundpost_metadata::models::{AnalysisUpdate, TrackRow, TrackSummaryRow, TrackUpdate};
use time::OffsetDateTime;
use uuid::Uuid;

/// Track representation returned to clients. Payload bytes never appear
/// here; playback goes through the streaming endpoints.
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub track_id: Uuid,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_secs: Option<f64>,
    pub cover_url: Option<String>,
    /// "inline", "cloud", or "none" (chunked upload still in flight).
    pub storage: &'static str,
    pub object_key: Option<String>,
    pub transcription_state: String,
    pub has_transcript: bool,
    pub tempo_bpm: Option<f64>,
    pub musical_key: Option<String>,
    pub energy: Option<f64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub analyzed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TrackResponse {
    pub(crate) fn from_row(row: &TrackRow) -> Self {
        Self {
            track_id: row.track_id,
            title: row.title.clone(),
            artist: row.artist.clone(),
            album: row.album.clone(),
            duration_secs: row.duration_secs,
            cover_url: row.cover_url.clone(),
            storage: match row.storage_pointer() {
                Some(StoragePointer::Cloud(_)) => "cloud",
                Some(StoragePointer::Inline) => "inline",
                None => "none",
            },
            object_key: row.object_key.clone(),
            transcription_state: row.transcription_state.clone(),
            has_transcript: row.transcript_text.is_some(),
            tempo_bpm: row.tempo_bpm,
            musical_key: row.musical_key.clone(),
            energy: row.energy,
            analyzed_at: row.analyzed_at,
            created_at: row.created_at,
        }
    }

    fn from_summary(row: &TrackSummaryRow) -> Self {
        Self {
            track_id: row.track_id,
            title: row.title.clone(),
            artist: row.artist.clone(),
            album: row.album.clone(),
            duration_secs: row.duration_secs,
            cover_url: row.cover_url.clone(),
            storage: match (row.has_inline_audio, &row.object_key) {
                (_, Some(_)) => "cloud",
                (true, None) => "inline",
                (false, None) => "none",
            },
            object_key: row.object_key.clone(),
            transcription_state: row.transcription_state.clone(),
            has_transcript: row.has_transcript,
            tempo_bpm: row.tempo_bpm,
            musical_key: row.musical_key.clone(),
            energy: row.energy,
            analyzed_at: None,
            created_at: row.created_at,
        }
    }
}

/// Build a fresh pending track row. Storage pointers are set afterwards by
/// the ingestion path that owns them.
pub(crate) fn new_track_row(
    owner_id: Uuid,
    metadata: &TrackMetadata,
    object_key: Option<String>,
) -> TrackRow {
    let now = OffsetDateTime::now_utc();
    TrackRow {
        track_id: Uuid::new_v4(),
        owner_id,
        title: metadata.title.clone(),
        artist: metadata.artist.clone(),
        album: metadata.album.clone(),
        duration_secs: metadata.duration_secs,
        cover_url: metadata.cover_url.clone(),
        inline_audio: None,
        inline_mime: None,
        object_key,
        transcription_state: "pending".to_string(),
        transcript_text: None,
        transcript_timings: None,
        transcript_language: None,
        transcript_error: None,
        tempo_bpm: None,
        musical_key: None,
        energy: None,
        analyzed_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn validate_metadata(metadata: &TrackMetadata) -> ApiResult<()> {
    if metadata.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }
    Ok(())
}

// =============================================================================
// Inline create
// =============================================================================

/// Request to create a track from a single inline payload.
#[derive(Debug, Deserialize)]
pub struct CreateTrackRequest {
    /// Base64-encoded audio payload.
    pub payload: String,
    pub mime_type: String,
    #[serde(flatten)]
    pub metadata: TrackMetadata,
}

/// POST /v1/tracks - Create a track from an inline payload.
pub async fn create_track(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<CreateTrackRequest>,
) -> ApiResult<(StatusCode, Json<TrackResponse>)> {
    validate_metadata(&req.metadata)?;
    if req.mime_type.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "mime_type must not be empty".to_string(),
        ));
    }

    let payload = BASE64
        .decode(req.payload.as_bytes())
        .map_err(|e| ApiError::BadRequest(format!("invalid base64 payload: {e}")))?;
    if payload.is_empty() {
        return Err(ApiError::BadRequest("payload must not be empty".to_string()));
    }
    state.facade.ensure_inline_capacity(payload.len() as u64)?;

    let row = new_track_row(user.user_id, &req.metadata, None);
    let track_id = row.track_id;
    state.metadata.create_track(&row).await?;
    state
        .facade
        .put_inline(track_id, &payload, &req.mime_type)
        .await?;

    TRACKS_CREATED.inc();
    tracing::info!(%track_id, size = payload.len(), "created inline track");

    // Out-of-band: allowed to fail independently of this response.
    state.pipeline.dispatch(track_id, false);

    let created = fetch_owned_track(&state, &user, track_id).await?;
    Ok((StatusCode::CREATED, Json(TrackResponse::from_row(&created))))
}

// =============================================================================
// Cloud-referenced create
// =============================================================================

/// Request to register a track whose audio was already uploaded to the
/// bucket with a presigned URL.
#[derive(Debug, Deserialize)]
pub struct CreateFromKeyRequest {
    /// Cloud object key returned by the presign step.
    pub object_key: String,
    #[serde(flatten)]
    pub metadata: TrackMetadata,
}

/// POST /v1/tracks/from-key - Create a track from a pre-uploaded object.
pub async fn create_track_from_key(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<CreateFromKeyRequest>,
) -> ApiResult<(StatusCode, Json<TrackResponse>)> {
    let row = insert_cloud_track(&state, &user, &req).await?;

    TRACKS_CREATED.inc();
    tracing::info!(track_id = %row.track_id, key = %req.object_key, "created cloud track");

    state.pipeline.dispatch(row.track_id, false);

    Ok((StatusCode::CREATED, Json(TrackResponse::from_row(&row))))
}

async fn insert_cloud_track(
    state: &AppState,
    user: &AuthenticatedUser,
    req: &CreateFromKeyRequest,
) -> ApiResult<TrackRow> {
    validate_metadata(&req.metadata)?;
    if req.object_key.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "object_key must not be empty".to_string(),
        ));
    }
    if !state.facade.cloud_available() {
        return Err(ApiError::StorageUnavailable);
    }

    let row = new_track_row(
        user.user_id,
        &req.metadata,
        Some(req.object_key.trim().to_string()),
    );
    state.metadata.create_track(&row).await?;
    Ok(row)
}

/// Batch cloud-referenced create request.
#[derive(Debug, Deserialize)]
pub struct BatchCreateRequest {
    pub tracks: Vec<CreateFromKeyRequest>,
}

/// Per-item outcome of a batch create.
#[derive(Debug, Serialize)]
pub struct BatchItemResult {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch create response: partial success, per-item outcomes.
#[derive(Debug, Serialize)]
pub struct BatchCreateResponse {
    pub created: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

/// POST /v1/tracks/from-key/batch - Bulk import of pre-uploaded objects.
/// Each entry succeeds or fails independently; one malformed entry never
/// aborts the batch.
pub async fn batch_create_from_keys(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<BatchCreateRequest>,
) -> ApiResult<Json<BatchCreateResponse>> {
    let limit = state.config.server.batch_create_limit;
    if req.tracks.len() > limit {
        return Err(ApiError::BadRequest(format!(
            "batch of {} entries exceeds the limit of {limit}",
            req.tracks.len()
        )));
    }

    let mut results = Vec::with_capacity(req.tracks.len());
    let mut created = 0usize;

    for (index, entry) in req.tracks.iter().enumerate() {
        match insert_cloud_track(&state, &user, entry).await {
            Ok(row) => {
                TRACKS_CREATED.inc();
                state.pipeline.dispatch(row.track_id, false);
                created += 1;
                results.push(BatchItemResult {
                    index,
                    track: Some(TrackResponse::from_row(&row)),
                    error: None,
                });
            }
            Err(e) => results.push(BatchItemResult {
                index,
                track: None,
                error: Some(e.to_string()),
            }),
        }
    }

    let failed = results.len() - created;
    Ok(Json(BatchCreateResponse {
        created,
        failed,
        results,
    }))
}

// =============================================================================
// CRUD
// =============================================================================

/// GET /v1/tracks - List the caller's tracks.
pub async fn list_tracks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<TrackResponse>>> {
    let rows = state.metadata.list_tracks(user.user_id).await?;
    Ok(Json(rows.iter().map(TrackResponse::from_summary).collect()))
}

/// GET /v1/tracks/{track_id} - Fetch one track.
pub async fn get_track(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(track_id): Path<Uuid>,
) -> ApiResult<Json<TrackResponse>> {
    let row = fetch_owned_track(&state, &user, track_id).await?;
    Ok(Json(TrackResponse::from_row(&row)))
}

/// PATCH /v1/tracks/{track_id} - Update descriptive metadata.
pub async fn update_track(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(track_id): Path<Uuid>,
    Json(update): Json<TrackUpdate>,
) -> ApiResult<Json<TrackResponse>> {
    if let Some(title) = &update.title
        && title.trim().is_empty()
    {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }

    state
        .metadata
        .update_track(track_id, user.user_id, &update, OffsetDateTime::now_utc())
        .await?;

    let row = fetch_owned_track(&state, &user, track_id).await?;
    Ok(Json(TrackResponse::from_row(&row)))
}

/// PUT /v1/tracks/{track_id}/analysis - Set tempo/key/energy.
pub async fn update_analysis(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(track_id): Path<Uuid>,
    Json(update): Json<AnalysisUpdate>,
) -> ApiResult<Json<TrackResponse>> {
    state
        .metadata
        .update_analysis(track_id, user.user_id, &update, OffsetDateTime::now_utc())
        .await?;

    let row = fetch_owned_track(&state, &user, track_id).await?;
    Ok(Json(TrackResponse::from_row(&row)))
}

/// DELETE /v1/tracks/{track_id} - Delete a track.
pub async fn delete_track(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(track_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = state.metadata.delete_track(track_id, user.user_id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("track {track_id}")));
    }
    tracing::info!(%track_id, "deleted track");
    Ok(StatusCode::NO_CONTENT)
}

//! Chunked upload handlers: init, chunk submission, finalize.

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::fetch_owned_track;
use crate::handlers::tracks::{TrackResponse, new_track_row};
use crate::metrics::{CHUNKS_RECEIVED, UPLOAD_SESSIONS_CREATED, UPLOAD_SESSIONS_FINALIZED};
use crate::sessions::ChunkedSession;
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use soundpost_core::MAX_DECLARED_CHUNKS;
use soundpost_core::track::TrackId;
use soundpost_core::upload::{
    ChunkStatus, InitChunkedUploadRequest, InitChunkedUploadResponse, SessionId,
};
use uuid::Uuid;

/// POST /v1/uploads/chunked - Open a session and pre-create its track row.
///
/// The track appears in listings immediately with indeterminate storage
/// status; finalize fills the pointer. Abandoned rows are reclaimed by the
/// missing-audio cleanup.
pub async fn init_chunked_upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<InitChunkedUploadRequest>,
) -> ApiResult<(StatusCode, Json<InitChunkedUploadResponse>)> {
    if req.total_chunks == 0 || req.total_chunks > MAX_DECLARED_CHUNKS {
        return Err(ApiError::BadRequest(format!(
            "total_chunks must be between 1 and {MAX_DECLARED_CHUNKS}"
        )));
    }
    if req.mime_type.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "mime_type must not be empty".to_string(),
        ));
    }
    if req.metadata.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }
    // The assembled payload lands inline; a declared size beyond the inline
    // ceiling is doomed, so reject at init instead of at finalize.
    state.facade.ensure_inline_capacity(req.declared_size)?;

    let row = new_track_row(user.user_id, &req.metadata, None);
    let track_id = row.track_id;
    state.metadata.create_track(&row).await?;

    let session = ChunkedSession::new(
        user.user_id,
        TrackId::from(track_id),
        req.total_chunks,
        req.declared_size,
        req.mime_type.clone(),
    );
    let session_id = state.sessions.insert(session).await;

    UPLOAD_SESSIONS_CREATED.inc();
    tracing::info!(
        %session_id,
        %track_id,
        total_chunks = req.total_chunks,
        declared_size = req.declared_size,
        "opened chunked upload session"
    );

    Ok((
        StatusCode::CREATED,
        Json(InitChunkedUploadResponse {
            session_id: session_id.to_string(),
            track_id: track_id.to_string(),
            max_chunk_size: state.config.server.max_chunk_size,
        }),
    ))
}

/// PUT /v1/uploads/chunked/{session_id}/chunks/{index} - Submit one chunk.
///
/// Re-submitting an index overwrites it, so client retries need no
/// server-side dedup.
pub async fn upload_chunk(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((session_id, index)): Path<(Uuid, u32)>,
    body: Bytes,
) -> ApiResult<Json<ChunkStatus>> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("chunk payload is empty".to_string()));
    }
    let max_chunk_size = state.config.server.max_chunk_size;
    if body.len() as u64 > max_chunk_size {
        return Err(ApiError::PayloadTooLarge {
            size: body.len() as u64,
            max: max_chunk_size,
        });
    }

    let status = state
        .sessions
        .put_chunk(SessionId::from(session_id), user.user_id, index, body)
        .await?;

    CHUNKS_RECEIVED.inc();
    Ok(Json(status))
}

/// Finalize response: the now-ingested track.
#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub track: TrackResponse,
    pub size: u64,
}

/// POST /v1/uploads/chunked/{session_id}/finalize - Assemble and ingest.
///
/// Requires completeness; rejects with the first missing index otherwise
/// and leaves the session intact for the client to repair.
pub async fn finalize_chunked_upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<FinalizeResponse>> {
    let session = state
        .sessions
        .take_complete(SessionId::from(session_id), user.user_id)
        .await?;
    let track_id = *session.track_id.as_uuid();
    let mime_type = session.mime_type.clone();

    let assembled = session.assemble();
    let size = assembled.len() as u64;

    state
        .facade
        .put_inline(track_id, &assembled, &mime_type)
        .await?;

    UPLOAD_SESSIONS_FINALIZED.inc();
    tracing::info!(%session_id, %track_id, size, "finalized chunked upload");

    state.pipeline.dispatch(track_id, false);

    let row = fetch_owned_track(&state, &user, track_id).await?;
    Ok(Json(FinalizeResponse {
        track: TrackResponse::from_row(&row),
        size,
    }))
}

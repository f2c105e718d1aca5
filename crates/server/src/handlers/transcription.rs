//! Transcription trigger and polling handlers.

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::fetch_owned_track;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use soundpost_core::{Transcript, TranscriptSegment, TranscriptWord};
use uuid::Uuid;

/// Single-track transcription trigger options.
#[derive(Debug, Default, Deserialize)]
pub struct TranscribeRequest {
    /// Re-transcribe even if a transcript already exists or a job appears
    /// to be running (remediation for stuck jobs).
    #[serde(default)]
    pub force: bool,
}

/// Dispatch acknowledgement. Completion is observed by polling the
/// transcript endpoint.
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub track_id: Uuid,
    pub dispatched: bool,
}

/// POST /v1/tracks/{track_id}/transcribe - Dispatch a single-track job.
pub async fn transcribe_track(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(track_id): Path<Uuid>,
    body: Option<Json<TranscribeRequest>>,
) -> ApiResult<(StatusCode, Json<TranscribeResponse>)> {
    let track = fetch_owned_track(&state, &user, track_id).await?;

    if !track.has_audio() {
        return Err(ApiError::BadRequest(
            "track has no audio to transcribe".to_string(),
        ));
    }
    if !state.pipeline.is_available() {
        return Err(ApiError::TranscriptionUnavailable);
    }

    let force = body.map(|Json(req)| req.force).unwrap_or_default();
    state.pipeline.dispatch(track_id, force);

    Ok((
        StatusCode::ACCEPTED,
        Json(TranscribeResponse {
            track_id,
            dispatched: true,
        }),
    ))
}

/// Batch run acknowledgement.
#[derive(Debug, Serialize)]
pub struct BatchTranscribeResponse {
    /// Number of tracks queued for sequential processing.
    pub queued: usize,
}

/// POST /v1/transcriptions/run - Queue every transcribable track the caller
/// owns. Responds immediately with the count; processing is sequential and
/// paced.
pub async fn transcribe_all(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<(StatusCode, Json<BatchTranscribeResponse>)> {
    let queued = state.pipeline.dispatch_batch(user.user_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(BatchTranscribeResponse { queued }),
    ))
}

/// Transcript poll response: status plus the transcript when completed.
#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub track_id: Uuid,
    pub state: String,
    pub text: Option<String>,
    pub language: Option<String>,
    pub segments: Vec<TranscriptSegment>,
    pub words: Vec<TranscriptWord>,
    /// Failure detail recorded by the last attempt, if any.
    pub error: Option<String>,
}

/// GET /v1/tracks/{track_id}/transcript - Poll transcription status/result.
pub async fn get_transcript(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(track_id): Path<Uuid>,
) -> ApiResult<Json<TranscriptResponse>> {
    let track = fetch_owned_track(&state, &user, track_id).await?;

    let (segments, words) = match &track.transcript_timings {
        Some(json) => match Transcript::from_timing_json(json) {
            Ok(t) => (t.segments, t.words),
            Err(e) => {
                tracing::warn!(%track_id, error = %e, "stored transcript timings unreadable");
                (Vec::new(), Vec::new())
            }
        },
        None => (Vec::new(), Vec::new()),
    };

    Ok(Json(TranscriptResponse {
        track_id,
        state: track.transcription_state.clone(),
        text: track.transcript_text.clone(),
        language: track.transcript_language.clone(),
        segments,
        words,
        error: track.transcript_error.clone(),
    }))
}

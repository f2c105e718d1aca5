//! Background transcription pipeline.
//!
//! Dispatch returns immediately; completion is observed only by polling the
//! track's transcription state. Jobs are fire-and-forget: a failure settles
//! the track to `failed` and is never propagated to the request that
//! triggered it.

use crate::error::{ApiError, ApiResult};
use crate::facade::StorageFacade;
use crate::metrics::{TRANSCRIPTIONS_COMPLETED, TRANSCRIPTIONS_FAILED};
use soundpost_core::Transcript;
use soundpost_metadata::MetadataStore;
use soundpost_transcribe::SpeechToText;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// Transcription job runner, constructor-injected into request handlers.
pub struct TranscriptionPipeline {
    metadata: Arc<dyn MetadataStore>,
    facade: Arc<StorageFacade>,
    stt: Option<Arc<dyn SpeechToText>>,
    batch_pacing: Duration,
}

impl TranscriptionPipeline {
    /// Create a new pipeline. `stt` is `None` when no speech-to-text
    /// capability is configured; dispatch then degrades to a no-op.
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        facade: Arc<StorageFacade>,
        stt: Option<Arc<dyn SpeechToText>>,
        batch_pacing: Duration,
    ) -> Self {
        Self {
            metadata,
            facade,
            stt,
            batch_pacing,
        }
    }

    /// Whether a speech-to-text capability is configured.
    pub fn is_available(&self) -> bool {
        self.stt.is_some()
    }

    /// Dispatch a single-track job without blocking the caller. Must only be
    /// called after the track row is durably persisted.
    pub fn dispatch(self: &Arc<Self>, track_id: Uuid, force: bool) {
        if self.stt.is_none() {
            tracing::debug!(%track_id, "no speech-to-text capability; skipping dispatch");
            return;
        }
        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline.run_job(track_id, force).await;
        });
    }

    /// Queue a batch run over every transcribable track of one owner.
    /// Returns the queued count immediately; items are processed
    /// sequentially with a pacing delay to respect provider rate limits.
    pub async fn dispatch_batch(self: &Arc<Self>, owner_id: Uuid) -> ApiResult<usize> {
        if self.stt.is_none() {
            return Err(ApiError::TranscriptionUnavailable);
        }

        let track_ids = self.metadata.list_transcribable_tracks(owner_id).await?;
        let queued = track_ids.len();

        if queued > 0 {
            let pipeline = self.clone();
            tokio::spawn(async move {
                tracing::info!(%owner_id, queued, "starting batch transcription run");
                for (position, track_id) in track_ids.into_iter().enumerate() {
                    if position > 0 {
                        tokio::time::sleep(pipeline.batch_pacing).await;
                    }
                    // Per-item isolation: one failure never halts the queue.
                    pipeline.run_job(track_id, false).await;
                }
                tracing::info!(%owner_id, "batch transcription run finished");
            });
        }

        Ok(queued)
    }

    /// Run one job to settlement. Never returns an error; outcomes land in
    /// the track row and the logs.
    async fn run_job(&self, track_id: Uuid, force: bool) {
        match self.try_transcribe(track_id, force).await {
            Ok(()) => {
                TRANSCRIPTIONS_COMPLETED.inc();
                tracing::info!(%track_id, "transcription completed");
            }
            Err(ApiError::Metadata(
                soundpost_metadata::MetadataError::InvalidStateTransition { from, to },
            )) => {
                // Lost a dispatch race (already processing or completed);
                // the track state is untouched.
                tracing::debug!(%track_id, %from, %to, "skipping transcription dispatch");
            }
            Err(e) => {
                TRANSCRIPTIONS_FAILED.inc();
                tracing::warn!(%track_id, error = %e, "transcription failed");
            }
        }
    }

    async fn try_transcribe(&self, track_id: Uuid, force: bool) -> ApiResult<()> {
        let Some(stt) = &self.stt else {
            return Err(ApiError::TranscriptionUnavailable);
        };

        // Mark processing first; an invalid transition aborts before any
        // bytes move.
        self.metadata
            .begin_transcription(track_id, force, OffsetDateTime::now_utc())
            .await?;

        match self.fetch_and_transcribe(stt.as_ref(), track_id).await {
            Ok(transcript) => {
                let timings = transcript.timing_json()?;
                self.metadata
                    .complete_transcription(
                        track_id,
                        &transcript.text,
                        &timings,
                        transcript.language.as_deref(),
                        OffsetDateTime::now_utc(),
                    )
                    .await?;
                Ok(())
            }
            Err(e) => {
                // Settle to failed so the track is never stuck in
                // processing; manual retry re-enters the state machine.
                if let Err(mark_err) = self
                    .metadata
                    .fail_transcription(track_id, &e.to_string(), OffsetDateTime::now_utc())
                    .await
                {
                    tracing::error!(
                        %track_id,
                        error = %mark_err,
                        "failed to record transcription failure"
                    );
                }
                Err(e)
            }
        }
    }

    async fn fetch_and_transcribe(
        &self,
        stt: &dyn SpeechToText,
        track_id: Uuid,
    ) -> ApiResult<Transcript> {
        let track = self
            .metadata
            .get_track(track_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("track {track_id}")))?;

        let (audio, mime_type) = self.facade.get_bytes(&track).await?;

        stt.transcribe(audio, &mime_type)
            .await
            .map_err(|e| ApiError::Internal(format!("{} provider: {e}", stt.provider_name())))
    }
}

//! Database models mapping to the metadata schema.

use serde::Deserialize;
use soundpost_core::track::{StoragePointer, TranscriptionState};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Tracks
// =============================================================================

/// Full track record, including the inline audio blob when present.
///
/// Listings use [`TrackSummaryRow`] instead so payload blobs never ride
/// along with browse queries.
#[derive(Debug, Clone, FromRow)]
pub struct TrackRow {
    pub track_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_secs: Option<f64>,
    pub cover_url: Option<String>,
    /// Inline audio payload; mutually exclusive with `object_key`.
    pub inline_audio: Option<Vec<u8>>,
    pub inline_mime: Option<String>,
    /// Cloud object key; mutually exclusive with `inline_audio`.
    pub object_key: Option<String>,
    pub transcription_state: String,
    pub transcript_text: Option<String>,
    /// Segment/word timing structure as JSON; meaningful only when
    /// `transcription_state` is `completed`.
    pub transcript_timings: Option<String>,
    pub transcript_language: Option<String>,
    pub transcript_error: Option<String>,
    pub tempo_bpm: Option<f64>,
    pub musical_key: Option<String>,
    pub energy: Option<f64>,
    pub analyzed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TrackRow {
    /// The track's storage pointer, if ingestion has completed.
    pub fn storage_pointer(&self) -> Option<StoragePointer> {
        match (&self.inline_audio, &self.object_key) {
            (_, Some(key)) => Some(StoragePointer::Cloud(key.clone())),
            (Some(_), None) => Some(StoragePointer::Inline),
            (None, None) => None,
        }
    }

    /// Whether any audio is retrievable for this track.
    pub fn has_audio(&self) -> bool {
        self.inline_audio.is_some() || self.object_key.is_some()
    }

    /// Parsed transcription state.
    pub fn transcription_state(&self) -> soundpost_core::Result<TranscriptionState> {
        TranscriptionState::parse(&self.transcription_state)
    }
}

/// Track record without the audio blob, for listings.
#[derive(Debug, Clone, FromRow)]
pub struct TrackSummaryRow {
    pub track_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_secs: Option<f64>,
    pub cover_url: Option<String>,
    /// Whether an inline payload exists (the payload itself is not fetched).
    pub has_inline_audio: bool,
    pub object_key: Option<String>,
    pub transcription_state: String,
    pub has_transcript: bool,
    pub tempo_bpm: Option<f64>,
    pub musical_key: Option<String>,
    pub energy: Option<f64>,
    pub created_at: OffsetDateTime,
}

/// Reference to a cloud-backed track, used by the integrity reconciler.
#[derive(Debug, Clone, FromRow)]
pub struct CloudTrackRef {
    pub track_id: Uuid,
    pub title: String,
    pub object_key: String,
}

/// Identity of a deleted track, reported back so clients can reconcile
/// their caches.
#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct RemovedTrack {
    pub track_id: Uuid,
    pub title: String,
}

/// Partial update of owner-mutable descriptive fields. `None` leaves the
/// field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_secs: Option<f64>,
    pub cover_url: Option<String>,
}

/// Analysis metadata update. Carries its own lifecycle, independent of
/// transcription.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisUpdate {
    pub tempo_bpm: Option<f64>,
    pub musical_key: Option<String>,
    pub energy: Option<f64>,
}

// =============================================================================
// Tokens
// =============================================================================

/// Bearer token record. Provisioned by the account layer; this subsystem
/// only verifies presented credentials against the stored hash.
#[derive(Debug, Clone, FromRow)]
pub struct TokenRow {
    pub token_id: Uuid,
    pub user_id: Uuid,
    /// SHA-256 hex of the raw bearer value.
    pub token_hash: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub revoked_at: Option<OffsetDateTime>,
}

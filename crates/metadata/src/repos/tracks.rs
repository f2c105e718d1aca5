//! Track repository.

use crate::error::MetadataResult;
use crate::models::{
    AnalysisUpdate, CloudTrackRef, RemovedTrack, TrackRow, TrackSummaryRow, TrackUpdate,
};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for track operations.
#[async_trait]
pub trait TrackRepo: Send + Sync {
    /// Create a track.
    async fn create_track(&self, track: &TrackRow) -> MetadataResult<()>;

    /// Get a track by ID, regardless of owner. Background jobs use this;
    /// request handlers go through [`get_track_for_owner`].
    ///
    /// [`get_track_for_owner`]: TrackRepo::get_track_for_owner
    async fn get_track(&self, track_id: Uuid) -> MetadataResult<Option<TrackRow>>;

    /// Get a track scoped to its owner. Returns None for tracks that exist
    /// but belong to someone else, so handlers never reveal existence.
    async fn get_track_for_owner(
        &self,
        track_id: Uuid,
        owner_id: Uuid,
    ) -> MetadataResult<Option<TrackRow>>;

    /// List an owner's tracks, newest first, without payload blobs.
    async fn list_tracks(&self, owner_id: Uuid) -> MetadataResult<Vec<TrackSummaryRow>>;

    /// Update owner-mutable descriptive fields.
    async fn update_track(
        &self,
        track_id: Uuid,
        owner_id: Uuid,
        update: &TrackUpdate,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Update analysis fields and stamp `analyzed_at`.
    async fn update_analysis(
        &self,
        track_id: Uuid,
        owner_id: Uuid,
        update: &AnalysisUpdate,
        analyzed_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Set the inline storage pointer, clearing any cloud key. The two
    /// pointers are mutually exclusive; setters enforce it.
    async fn set_inline_audio(
        &self,
        track_id: Uuid,
        payload: &[u8],
        mime_type: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Set the cloud storage pointer, clearing any inline payload.
    async fn set_object_key(
        &self,
        track_id: Uuid,
        object_key: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Fetch just the inline payload and its MIME type.
    async fn get_inline_audio(
        &self,
        track_id: Uuid,
    ) -> MetadataResult<Option<(Vec<u8>, Option<String>)>>;

    /// Transition the track to `processing`, validating the state machine.
    /// `force` permits re-entry from `completed` (explicit re-transcription)
    /// and from a stuck `processing`.
    async fn begin_transcription(
        &self,
        track_id: Uuid,
        force: bool,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Persist a transcript and mark the track `completed`.
    async fn complete_transcription(
        &self,
        track_id: Uuid,
        text: &str,
        timings_json: &str,
        language: Option<&str>,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Mark the track `failed`, recording the error for later inspection.
    async fn fail_transcription(
        &self,
        track_id: Uuid,
        error: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// IDs of an owner's tracks with retrievable audio, not currently
    /// `processing`, and lacking a transcript. Batch transcription input.
    async fn list_transcribable_tracks(&self, owner_id: Uuid) -> MetadataResult<Vec<Uuid>>;

    /// An owner's cloud-backed tracks, for the integrity reconciler.
    async fn list_cloud_tracks(&self, owner_id: Uuid) -> MetadataResult<Vec<CloudTrackRef>>;

    /// Delete a track scoped to its owner. Returns false if nothing matched.
    async fn delete_track(&self, track_id: Uuid, owner_id: Uuid) -> MetadataResult<bool>;

    /// Delete an owner's tracks that carry neither storage pointer
    /// (abandoned chunked-upload pre-creations). Returns what was removed.
    async fn delete_tracks_missing_audio(
        &self,
        owner_id: Uuid,
    ) -> MetadataResult<Vec<RemovedTrack>>;

    /// Delete tracks by ID. Used by the integrity reconciler after failed
    /// readability probes. Returns the number of rows removed.
    async fn delete_tracks_by_id(&self, track_ids: &[Uuid]) -> MetadataResult<u64>;
}

//! Track identity, storage pointers, and the transcription state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a track.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(Uuid);

impl TrackId {
    /// Generate a new random track ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidTrackId(format!("{s}: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TrackId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackId({})", self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a track's audio bytes live.
///
/// A fully ingested track has exactly one of these; a track pre-created by
/// chunked-upload init has neither until finalize sets the inline pointer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoragePointer {
    /// Bytes persisted alongside the metadata row.
    Inline,
    /// Keyed object in the external bucket.
    Cloud(String),
}

impl StoragePointer {
    /// The cloud object key, if this pointer is cloud-backed.
    pub fn object_key(&self) -> Option<&str> {
        match self {
            Self::Cloud(key) => Some(key),
            Self::Inline => None,
        }
    }
}

/// Transcription lifecycle state for a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionState {
    /// Audio stored, transcription not yet attempted.
    Pending,
    /// A transcription job is running.
    Processing,
    /// Transcript persisted.
    Completed,
    /// The last attempt failed; retryable.
    Failed,
}

impl TranscriptionState {
    /// Parse from the database representation.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(crate::Error::InvalidTranscriptionState(other.to_string())),
        }
    }

    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether a job may transition this state to `processing`.
    ///
    /// `completed` is terminal unless the caller explicitly forces a
    /// re-transcription.
    pub fn can_begin_processing(&self, force: bool) -> bool {
        match self {
            Self::Pending | Self::Failed => true,
            Self::Processing | Self::Completed => force,
        }
    }
}

impl fmt::Display for TranscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner-mutable descriptive metadata for a track.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    /// Duration in seconds, as reported by the client.
    #[serde(default)]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_roundtrip() {
        let id = TrackId::new();
        let parsed = TrackId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(TrackId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_transcription_state_roundtrip() {
        for state in [
            TranscriptionState::Pending,
            TranscriptionState::Processing,
            TranscriptionState::Completed,
            TranscriptionState::Failed,
        ] {
            assert_eq!(TranscriptionState::parse(state.as_str()).unwrap(), state);
        }
        assert!(TranscriptionState::parse("done").is_err());
    }

    #[test]
    fn test_begin_processing_transitions() {
        assert!(TranscriptionState::Pending.can_begin_processing(false));
        assert!(TranscriptionState::Failed.can_begin_processing(false));
        assert!(!TranscriptionState::Completed.can_begin_processing(false));
        assert!(!TranscriptionState::Processing.can_begin_processing(false));
        assert!(TranscriptionState::Completed.can_begin_processing(true));
    }

    #[test]
    fn test_storage_pointer_object_key() {
        assert_eq!(StoragePointer::Inline.object_key(), None);
        assert_eq!(
            StoragePointer::Cloud("users/a/b.mp3".into()).object_key(),
            Some("users/a/b.mp3")
        );
    }
}

//! Chunked upload session identity and wire types.

use crate::track::TrackMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a chunked upload session.
///
/// Generated server-side at init; unguessable, and the only handle a client
/// holds on its in-flight chunks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidSessionId(format!("{s}: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request to open a chunked upload session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitChunkedUploadRequest {
    /// Declared number of chunks the client will submit.
    pub total_chunks: u32,
    /// Declared total payload size in bytes.
    pub declared_size: u64,
    /// MIME type of the assembled audio.
    pub mime_type: String,
    /// Descriptive metadata for the pre-created track.
    #[serde(flatten)]
    pub metadata: TrackMetadata,
}

/// Response from opening a chunked upload session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitChunkedUploadResponse {
    pub session_id: String,
    /// The pre-created track row the session will fill.
    pub track_id: String,
    /// Per-chunk size ceiling the server will accept.
    pub max_chunk_size: u64,
}

/// Progress snapshot returned after each chunk submission.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ChunkStatus {
    /// Distinct chunk indices received so far.
    pub received: u32,
    /// Declared total.
    pub total: u32,
    /// Whether every index in `[0, total)` has been received.
    pub complete: bool,
}

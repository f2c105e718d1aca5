//! Core domain types and shared logic for the Soundpost media backend.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Track identity, storage pointers, and descriptive metadata
//! - Transcription state machine and transcript structure
//! - Chunked upload session wire types
//! - Configuration types

pub mod config;
pub mod error;
pub mod track;
pub mod transcript;
pub mod upload;

pub use error::{Error, Result};
pub use track::{StoragePointer, TrackId, TrackMetadata, TranscriptionState};
pub use transcript::{Transcript, TranscriptSegment, TranscriptWord};
pub use upload::{ChunkStatus, SessionId};

/// Default per-chunk size ceiling for chunked uploads: 8 MiB.
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// Default ceiling for inline audio payloads: 25 MiB.
pub const DEFAULT_MAX_INLINE_PAYLOAD: u64 = 25 * 1024 * 1024;

/// Maximum number of chunks a single session may declare.
pub const MAX_DECLARED_CHUNKS: u32 = 512;

//! Transcript structure produced by the speech-to-text capability.

use serde::{Deserialize, Serialize};

/// A completed transcript with segment- and word-level timing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Full transcript text.
    pub text: String,
    /// Detected language code (e.g. "en"), if the provider reports one.
    #[serde(default)]
    pub language: Option<String>,
    /// Segment-level timing.
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
    /// Word-level timing.
    #[serde(default)]
    pub words: Vec<TranscriptWord>,
}

/// One timed segment of a transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// One timed word of a transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl Transcript {
    /// Serialize the timing structure (everything but the flat text) to JSON
    /// for storage in the metadata row.
    pub fn timing_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }

    /// Parse a stored timing structure.
    pub fn from_timing_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}

//! Speech-to-text capability interface for Soundpost.
//!
//! The capability is entirely optional at deploy time: absent configuration,
//! `from_config` returns `None` and the transcription pipeline degrades to
//! "no transcription" rather than failing track creation.

pub mod client;
pub mod error;

pub use client::OpenAiCompatibleClient;
pub use error::{TranscribeError, TranscribeResult};

use async_trait::async_trait;
use bytes::Bytes;
use soundpost_core::Transcript;
use soundpost_core::config::TranscriptionConfig;
use std::sync::Arc;

/// External speech-to-text capability.
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe an audio payload, requesting segment- and word-level
    /// timestamps. Implementations must bound the request with a timeout.
    async fn transcribe(&self, audio: Bytes, mime_type: &str) -> TranscribeResult<Transcript>;

    /// Static identifier for logging.
    fn provider_name(&self) -> &'static str;
}

/// Create a speech-to-text client from configuration, or `None` when the
/// capability is unconfigured.
pub fn from_config(config: Option<&TranscriptionConfig>) -> TranscribeResult<Option<Arc<dyn SpeechToText>>> {
    match config {
        Some(config) => {
            let client = OpenAiCompatibleClient::new(config)?;
            Ok(Some(Arc::new(client)))
        }
        None => Ok(None),
    }
}

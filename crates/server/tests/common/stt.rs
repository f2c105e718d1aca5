//! Mock speech-to-text capability for pipeline tests.

use async_trait::async_trait;
use bytes::Bytes;
use soundpost_core::{Transcript, TranscriptSegment, TranscriptWord};
use soundpost_transcribe::{SpeechToText, TranscribeError, TranscribeResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Mock provider that records invocations and can be flipped between
/// success and failure mid-test.
pub struct MockSpeechToText {
    calls: AtomicUsize,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl MockSpeechToText {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn failing() -> Arc<Self> {
        let mock = Self::new();
        mock.set_fail(true);
        mock
    }

    /// Number of transcribe invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Flip the mock between failing and succeeding.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpeechToText for MockSpeechToText {
    async fn transcribe(&self, audio: Bytes, _mime_type: &str) -> TranscribeResult<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(TranscribeError::Provider {
                status: 500,
                message: "mock provider failure".to_string(),
            });
        }

        // Deterministic transcript derived from the payload length so tests
        // can assert the right bytes reached the provider.
        let text = format!("transcript of {} bytes", audio.len());
        Ok(Transcript {
            text: text.clone(),
            language: Some("en".to_string()),
            segments: vec![TranscriptSegment {
                start: 0.0,
                end: 1.0,
                text,
            }],
            words: vec![TranscriptWord {
                word: "transcript".to_string(),
                start: 0.0,
                end: 0.4,
            }],
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

//! HTTP client for OpenAI-compatible transcription APIs.

use crate::error::{TranscribeError, TranscribeResult};
use crate::SpeechToText;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use soundpost_core::config::TranscriptionConfig;
use soundpost_core::{Transcript, TranscriptSegment, TranscriptWord};

/// Client for a `POST {endpoint}/audio/transcriptions` API in the OpenAI
/// shape (Whisper, and the many self-hosted servers that mirror it).
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    timeout_secs: u64,
}

impl OpenAiCompatibleClient {
    /// Create a new client from configuration.
    pub fn new(config: &TranscriptionConfig) -> TranscribeResult<Self> {
        if config.endpoint.is_empty() {
            return Err(TranscribeError::Config(
                "transcription.endpoint must not be empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn file_name_for_mime(mime_type: &str) -> &'static str {
        // Providers sniff the container from the filename extension.
        match mime_type {
            "audio/mpeg" | "audio/mp3" => "audio.mp3",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "audio.wav",
            "audio/ogg" => "audio.ogg",
            "audio/flac" | "audio/x-flac" => "audio.flac",
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "audio.m4a",
            "audio/webm" => "audio.webm",
            _ => "audio.bin",
        }
    }
}

#[async_trait]
impl SpeechToText for OpenAiCompatibleClient {
    async fn transcribe(&self, audio: Bytes, mime_type: &str) -> TranscribeResult<Transcript> {
        let file_part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(Self::file_name_for_mime(mime_type))
            .mime_str(mime_type)
            .map_err(|e| TranscribeError::Config(format!("invalid mime type {mime_type}: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .text("timestamp_granularities[]", "word");

        let mut request = self
            .http
            .post(format!("{}/audio/transcriptions", self.endpoint))
            .multipart(form);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let started = std::time::Instant::now();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TranscribeError::Timeout(self.timeout_secs)
            } else {
                TranscribeError::Transport(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body: VerboseJsonResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::InvalidResponse(e.to_string()))?;

        if body.text.trim().is_empty() {
            return Err(TranscribeError::InvalidResponse(
                "provider returned an empty transcript".to_string(),
            ));
        }

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            segments = body.segments.len(),
            words = body.words.len(),
            "transcription request completed"
        );

        Ok(body.into_transcript())
    }

    fn provider_name(&self) -> &'static str {
        "openai-compatible"
    }
}

/// `verbose_json` response shape.
#[derive(Debug, Deserialize)]
struct VerboseJsonResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
    #[serde(default)]
    words: Vec<VerboseWord>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct VerboseWord {
    word: String,
    start: f64,
    end: f64,
}

impl VerboseJsonResponse {
    fn into_transcript(self) -> Transcript {
        Transcript {
            text: self.text,
            language: self.language,
            segments: self
                .segments
                .into_iter()
                .map(|s| TranscriptSegment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
                .collect(),
            words: self
                .words
                .into_iter()
                .map(|w| TranscriptWord {
                    word: w.word,
                    start: w.start,
                    end: w.end,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn make_client(base_url: &str) -> OpenAiCompatibleClient {
        let config = TranscriptionConfig {
            endpoint: base_url.to_string(),
            api_key: Some("sk-test".to_string()),
            model: "whisper-1".to_string(),
            request_timeout_secs: 5,
            batch_pacing_ms: 0,
        };
        OpenAiCompatibleClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_transcribe_parses_verbose_json() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/audio/transcriptions")
                    .header("authorization", "Bearer sk-test");
                then.status(200).json_body(serde_json::json!({
                    "text": "hello world",
                    "language": "en",
                    "segments": [
                        {"id": 0, "start": 0.0, "end": 1.4, "text": "hello world"}
                    ],
                    "words": [
                        {"word": "hello", "start": 0.0, "end": 0.6},
                        {"word": "world", "start": 0.7, "end": 1.4}
                    ]
                }));
            })
            .await;

        let client = make_client(&server.base_url());
        let transcript = client
            .transcribe(Bytes::from_static(b"fake-mp3"), "audio/mpeg")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(transcript.text, "hello world");
        assert_eq!(transcript.language.as_deref(), Some("en"));
        assert_eq!(transcript.segments.len(), 1);
        assert_eq!(transcript.words.len(), 2);
        assert_eq!(transcript.words[0].word, "hello");
    }

    #[tokio::test]
    async fn test_provider_error_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/audio/transcriptions");
                then.status(429).body("rate limited");
            })
            .await;

        let client = make_client(&server.base_url());
        let err = client
            .transcribe(Bytes::from_static(b"x"), "audio/wav")
            .await
            .unwrap_err();

        match err {
            TranscribeError::Provider { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_transcript_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/audio/transcriptions");
                then.status(200).json_body(serde_json::json!({"text": "  "}));
            })
            .await;

        let client = make_client(&server.base_url());
        let err = client
            .transcribe(Bytes::from_static(b"x"), "audio/wav")
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::InvalidResponse(_)));
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let config = TranscriptionConfig {
            endpoint: String::new(),
            api_key: None,
            model: "whisper-1".to_string(),
            request_timeout_secs: 5,
            batch_pacing_ms: 0,
        };
        assert!(OpenAiCompatibleClient::new(&config).is_err());
    }
}

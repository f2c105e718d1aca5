//! Application state shared across handlers.

use crate::facade::StorageFacade;
use crate::pipeline::TranscriptionPipeline;
use crate::sessions::SessionStore;
use soundpost_core::config::AppConfig;
use soundpost_metadata::MetadataStore;
use soundpost_storage::ObjectStore;
use soundpost_transcribe::SpeechToText;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Storage facade over inline and cloud residence.
    pub facade: Arc<StorageFacade>,
    /// In-memory chunked upload sessions.
    pub sessions: Arc<SessionStore>,
    /// Background transcription pipeline.
    pub pipeline: Arc<TranscriptionPipeline>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Panics
    ///
    /// Panics if configuration validation fails; construction happens at
    /// startup where failing fast is the right behavior.
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        cloud: Option<Arc<dyn ObjectStore>>,
        stt: Option<Arc<dyn SpeechToText>>,
    ) -> Self {
        if let Err(error) = config.validate() {
            panic!("Invalid configuration: {}", error);
        }

        let facade = Arc::new(StorageFacade::new(
            metadata.clone(),
            cloud,
            config.server.max_inline_payload,
            config.server.signed_url_ttl(),
            config.server.cloud_op_timeout(),
        ));

        let sessions = Arc::new(SessionStore::new(config.server.session_ttl()));

        let batch_pacing = config
            .transcription
            .as_ref()
            .map(|t| t.batch_pacing())
            .unwrap_or_default();
        let pipeline = Arc::new(TranscriptionPipeline::new(
            metadata.clone(),
            facade.clone(),
            stt,
            batch_pacing,
        ));

        Self {
            config: Arc::new(config),
            metadata,
            facade,
            sessions,
            pipeline,
        }
    }

    /// Request body ceiling for the router: the largest legitimate payload
    /// is a base64-encoded inline track (4/3 inflation), with headroom.
    pub fn body_limit(&self) -> usize {
        let inline = self.config.server.max_inline_payload;
        let chunk = self.config.server.max_chunk_size;
        let ceiling = inline.max(chunk);
        (ceiling + ceiling / 2 + 1024) as usize
    }
}

//! Server test utilities.

use soundpost_core::config::{AppConfig, MetadataConfig, ServerConfig};
use soundpost_metadata::{MetadataStore, SqliteStore};
use soundpost_server::{AppState, create_router};
use soundpost_storage::{FilesystemBackend, ObjectStore};
use soundpost_transcribe::SpeechToText;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    /// Root of the filesystem "cloud" bucket, when one is configured. Tests
    /// corrupt objects here to simulate unreadable cloud state.
    pub storage_root: Option<PathBuf>,
    _temp_dir: TempDir,
}

/// Builder for test servers; defaults to no cloud backend and no
/// speech-to-text capability.
#[allow(dead_code)]
pub struct TestServerBuilder {
    cloud: bool,
    stt: Option<Arc<dyn SpeechToText>>,
    session_ttl_secs: u64,
    max_inline_payload: u64,
    proxy_streaming: bool,
}

#[allow(dead_code)]
impl TestServerBuilder {
    /// Back the "cloud" with a filesystem bucket in the temp dir.
    pub fn with_cloud(mut self) -> Self {
        self.cloud = true;
        self
    }

    /// Install a speech-to-text capability.
    pub fn with_stt(mut self, stt: Arc<dyn SpeechToText>) -> Self {
        self.stt = Some(stt);
        self
    }

    /// Override the upload session TTL (0 = everything expires instantly).
    pub fn with_session_ttl_secs(mut self, secs: u64) -> Self {
        self.session_ttl_secs = secs;
        self
    }

    /// Override the inline payload ceiling.
    pub fn with_max_inline_payload(mut self, bytes: u64) -> Self {
        self.max_inline_payload = bytes;
        self
    }

    pub async fn build(self) -> TestServer {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let (cloud, storage_root): (Option<Arc<dyn ObjectStore>>, Option<PathBuf>) = if self.cloud {
            let storage_path = temp_dir.path().join("storage");
            let backend = FilesystemBackend::new(&storage_path)
                .await
                .expect("Failed to create storage backend");
            (Some(Arc::new(backend)), Some(storage_path))
        } else {
            (None, None)
        };

        let db_path = temp_dir.path().join("metadata.db");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );

        let server_config = ServerConfig {
            session_ttl_secs: self.session_ttl_secs,
            max_inline_payload: self.max_inline_payload,
            proxy_streaming: self.proxy_streaming,
            ..Default::default()
        };

        let config = AppConfig {
            server: server_config,
            storage: None, // backends are injected directly below
            metadata: MetadataConfig::Sqlite { path: db_path },
            transcription: None,
        };

        let state = AppState::new(config, metadata, cloud, self.stt);
        let router = create_router(state.clone());

        TestServer {
            router,
            state,
            storage_root,
            _temp_dir: temp_dir,
        }
    }
}

#[allow(dead_code)]
impl TestServer {
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder {
            cloud: false,
            stt: None,
            session_ttl_secs: 1800,
            max_inline_payload: soundpost_core::DEFAULT_MAX_INLINE_PAYLOAD,
            proxy_streaming: false,
        }
    }

    /// Create a test server with default settings (no cloud, no STT).
    pub async fn new() -> Self {
        Self::builder().build().await
    }

    /// Access the metadata store.
    pub fn metadata(&self) -> &Arc<dyn MetadataStore> {
        &self.state.metadata
    }

    /// Path of a cloud object inside the filesystem bucket.
    pub fn object_path(&self, key: &str) -> PathBuf {
        self.storage_root
            .as_ref()
            .expect("test server has no cloud storage")
            .join(key)
    }
}

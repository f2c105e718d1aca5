//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Ceiling for inline audio payloads in bytes.
    #[serde(default = "default_max_inline_payload")]
    pub max_inline_payload: u64,
    /// Per-chunk size ceiling for chunked uploads in bytes.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u64,
    /// Upload session TTL in seconds. Sessions untouched past this are reaped.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Interval of the session sweep loop in seconds.
    #[serde(default = "default_session_sweep_interval_secs")]
    pub session_sweep_interval_secs: u64,
    /// Lifetime of presigned upload/download URLs in seconds.
    #[serde(default = "default_signed_url_ttl_secs")]
    pub signed_url_ttl_secs: u64,
    /// Maximum descriptors per batch presign request.
    #[serde(default = "default_batch_sign_limit")]
    pub batch_sign_limit: usize,
    /// Maximum entries per batch cloud-referenced create.
    #[serde(default = "default_batch_create_limit")]
    pub batch_create_limit: usize,
    /// Always proxy cloud playback through this service instead of
    /// redirecting to a signed URL. For deployments where clients cannot
    /// reach the bucket origin directly.
    #[serde(default)]
    pub proxy_streaming: bool,
    /// Timeout applied to individual cloud storage operations, in seconds.
    #[serde(default = "default_cloud_op_timeout_secs")]
    pub cloud_op_timeout_secs: u64,
    /// Enable the /metrics endpoint for Prometheus scraping.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_inline_payload() -> u64 {
    crate::DEFAULT_MAX_INLINE_PAYLOAD
}

fn default_max_chunk_size() -> u64 {
    crate::DEFAULT_MAX_CHUNK_SIZE
}

fn default_session_ttl_secs() -> u64 {
    1800 // 30 minutes
}

fn default_session_sweep_interval_secs() -> u64 {
    60
}

fn default_signed_url_ttl_secs() -> u64 {
    900
}

fn default_batch_sign_limit() -> usize {
    25
}

fn default_batch_create_limit() -> usize {
    100
}

fn default_cloud_op_timeout_secs() -> u64 {
    30
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_inline_payload: default_max_inline_payload(),
            max_chunk_size: default_max_chunk_size(),
            session_ttl_secs: default_session_ttl_secs(),
            session_sweep_interval_secs: default_session_sweep_interval_secs(),
            signed_url_ttl_secs: default_signed_url_ttl_secs(),
            batch_sign_limit: default_batch_sign_limit(),
            batch_create_limit: default_batch_create_limit(),
            proxy_streaming: false,
            cloud_op_timeout_secs: default_cloud_op_timeout_secs(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ServerConfig {
    /// Session TTL as a Duration.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Sweep interval as a Duration. Guards against a zero interval, which
    /// would make `tokio::time::interval` panic.
    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs.max(1))
    }

    /// Signed URL lifetime as a Duration.
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }

    /// Per-operation cloud timeout as a Duration.
    pub fn cloud_op_timeout(&self) -> Duration {
        Duration::from_secs(self.cloud_op_timeout_secs)
    }
}

/// Cloud object storage configuration.
///
/// Absent entirely (`storage` key omitted) the service runs inline-only and
/// every cloud-dependent operation reports `storage_unavailable`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage. Signed URLs are unsupported; playback of
    /// cloud-pointer tracks falls back to proxying.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to the ambient credential chain if
        /// not set. Prefer env vars or IAM roles over config-file secrets.
        access_key_id: Option<String>,
        /// AWS secret access key.
        secret_access_key: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO
        /// and some S3-compatible services.
        #[serde(default)]
        force_path_style: bool,
    },
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::S3 {
                access_key_id,
                secret_access_key,
                ..
            } => match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                (Some(_), Some(_)) | (None, None) => Ok(()),
                _ => Err(
                    "s3 config requires both access_key_id and secret_access_key when either is set"
                        .to_string(),
                ),
            },
            _ => Ok(()),
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite-backed metadata store.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/soundpost.db"),
        }
    }
}

/// Speech-to-text capability configuration.
///
/// Absent entirely, transcription degrades to "no transcription": tracks are
/// still created and stay `pending`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Base URL of an OpenAI-compatible transcription API
    /// (e.g., "https://api.openai.com/v1").
    pub endpoint: String,
    /// Bearer credential for the provider, if it requires one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model identifier passed to the provider.
    #[serde(default = "default_transcription_model")]
    pub model: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_transcription_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Pause between items of a batch transcription run, in milliseconds.
    /// Exists to respect provider rate limits; batch runs are sequential.
    #[serde(default = "default_batch_pacing_ms")]
    pub batch_pacing_ms: u64,
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_transcription_timeout_secs() -> u64 {
    120
}

fn default_batch_pacing_ms() -> u64 {
    2000
}

impl TranscriptionConfig {
    /// Per-request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Batch pacing delay as a Duration.
    pub fn batch_pacing(&self) -> Duration {
        Duration::from_millis(self.batch_pacing_ms)
    }
}

/// Top-level application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Cloud storage; omit for an inline-only deployment.
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Speech-to-text capability; omit to disable transcription.
    #[serde(default)]
    pub transcription: Option<TranscriptionConfig>,
}

impl AppConfig {
    /// Create a test configuration with no cloud storage and no
    /// transcription capability.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: None,
            metadata: MetadataConfig::default(),
            transcription: None,
        }
    }

    /// Validate cross-cutting configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(storage) = &self.storage {
            storage.validate()?;
        }
        if self.server.max_chunk_size == 0 {
            return Err("server.max_chunk_size must be non-zero".to_string());
        }
        if self.server.max_inline_payload == 0 {
            return Err("server.max_inline_payload must be non-zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        AppConfig::for_testing().validate().unwrap();
    }

    #[test]
    fn test_s3_requires_paired_credentials() {
        let config = StorageConfig::S3 {
            bucket: "b".into(),
            endpoint: None,
            region: None,
            prefix: None,
            access_key_id: Some("id".into()),
            secret_access_key: None,
            force_path_style: false,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sweep_interval_never_zero() {
        let config = ServerConfig {
            session_sweep_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.session_sweep_interval(), Duration::from_secs(1));
    }
}

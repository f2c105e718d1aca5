//! Object storage facade.
//!
//! Every consumer of track audio asks this one interface instead of
//! branching on pointer shape. The facade arbitrates between inline
//! residence (bytes in the metadata row) and the optional cloud bucket,
//! applies bounded timeouts to cloud calls, and latches the cloud path into
//! degraded mode after repeated credential failures.

use crate::error::{ApiError, ApiResult};
use bytes::Bytes;
use soundpost_metadata::MetadataStore;
use soundpost_metadata::models::TrackRow;
use soundpost_storage::{ByteStream, ObjectMeta, ObjectStore, StorageError, StorageResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// Bytes fetched by a readability probe.
const PROBE_LEN: u64 = 1024;

/// Consecutive credential failures after which the cloud path is degraded
/// to `StorageUnavailable` instead of retrying per request.
const AUTH_FAILURE_DEGRADE_THRESHOLD: u32 = 5;

/// Maximum filename length preserved in generated object keys.
const MAX_KEY_FILENAME_LEN: usize = 100;

/// Uniform interface over inline and cloud audio residence.
pub struct StorageFacade {
    metadata: Arc<dyn MetadataStore>,
    cloud: Option<Arc<dyn ObjectStore>>,
    max_inline_payload: u64,
    signed_url_ttl: Duration,
    op_timeout: Duration,
    auth_failures: AtomicU32,
    degraded: AtomicBool,
}

impl StorageFacade {
    /// Create a new facade. `cloud` is `None` for inline-only deployments.
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        cloud: Option<Arc<dyn ObjectStore>>,
        max_inline_payload: u64,
        signed_url_ttl: Duration,
        op_timeout: Duration,
    ) -> Self {
        Self {
            metadata,
            cloud,
            max_inline_payload,
            signed_url_ttl,
            op_timeout,
            auth_failures: AtomicU32::new(0),
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether cloud-dependent operations can currently be attempted.
    pub fn cloud_available(&self) -> bool {
        self.cloud.is_some() && !self.degraded.load(Ordering::Relaxed)
    }

    /// The cloud backend, or `StorageUnavailable` when unconfigured or
    /// degraded. Callers are expected to fall back to the inline path and
    /// signal the fallback to clients rather than failing outright.
    fn cloud(&self) -> ApiResult<Arc<dyn ObjectStore>> {
        if self.degraded.load(Ordering::Relaxed) {
            return Err(ApiError::StorageUnavailable);
        }
        self.cloud.clone().ok_or(ApiError::StorageUnavailable)
    }

    /// Run one cloud operation under the configured timeout, tracking
    /// credential failures for the degradation latch.
    async fn cloud_op<T>(
        &self,
        op: impl Future<Output = StorageResult<T>>,
    ) -> ApiResult<T> {
        let result = match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => {
                return Err(ApiError::Storage(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("cloud operation timed out after {:?}", self.op_timeout),
                ))));
            }
        };

        match &result {
            Ok(_) => {
                self.auth_failures.store(0, Ordering::Relaxed);
            }
            Err(e) if e.is_auth_failure() => {
                let failures = self.auth_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= AUTH_FAILURE_DEGRADE_THRESHOLD
                    && !self.degraded.swap(true, Ordering::Relaxed)
                {
                    tracing::error!(
                        failures,
                        "repeated cloud credential failures; degrading cloud storage path"
                    );
                }
            }
            Err(_) => {}
        }

        result.map_err(ApiError::from)
    }

    /// Reject payloads beyond the inline ceiling before any row is touched.
    pub fn ensure_inline_capacity(&self, size: u64) -> ApiResult<()> {
        if size > self.max_inline_payload {
            return Err(ApiError::PayloadTooLarge {
                size,
                max: self.max_inline_payload,
            });
        }
        Ok(())
    }

    /// Persist an audio payload inline with the track row, clearing any
    /// cloud key (pointer exclusivity lives in the metadata layer).
    pub async fn put_inline(&self, track_id: Uuid, payload: &[u8], mime_type: &str) -> ApiResult<()> {
        self.ensure_inline_capacity(payload.len() as u64)?;
        self.metadata
            .set_inline_audio(track_id, payload, mime_type, OffsetDateTime::now_utc())
            .await?;
        Ok(())
    }

    /// Generate the bucket key for a new upload.
    pub fn upload_key(&self, owner_id: Uuid, filename: &str) -> String {
        format!(
            "users/{}/audio/{}-{}",
            owner_id,
            Uuid::new_v4(),
            sanitize_filename(filename)
        )
    }

    /// Presign a direct client→bucket upload. Returns the generated key and
    /// the time-limited URL.
    pub async fn signed_put_url(
        &self,
        owner_id: Uuid,
        filename: &str,
        content_type: &str,
    ) -> ApiResult<(String, String)> {
        let cloud = self.cloud()?;
        let key = self.upload_key(owner_id, filename);
        let url = self
            .cloud_op(cloud.signed_put_url(&key, content_type, self.signed_url_ttl))
            .await
            .map_err(unsupported_to_unavailable)?;
        Ok((key, url))
    }

    /// Server-mediated upload for clients that cannot reach the bucket
    /// origin directly (CORS-restricted browsers).
    pub async fn proxy_put(
        &self,
        owner_id: Uuid,
        filename: &str,
        content_type: &str,
        payload: Bytes,
    ) -> ApiResult<String> {
        let cloud = self.cloud()?;
        let key = self.upload_key(owner_id, filename);
        self.cloud_op(cloud.put(&key, payload, Some(content_type)))
            .await?;
        Ok(key)
    }

    /// Fetch a track's audio fully buffered, for the transcription pipeline.
    ///
    /// Prefers the cloud pointer; rows migrated from older deployments can
    /// carry a stale inline blob alongside a newer cloud key, so a cloud
    /// fetch failure falls back to the inline payload before giving up.
    pub async fn get_bytes(&self, track: &TrackRow) -> ApiResult<(Bytes, String)> {
        if let Some(key) = &track.object_key {
            let cloud_result = match self.cloud() {
                Ok(cloud) => self.cloud_op(cloud.get(key)).await,
                Err(e) => Err(e),
            };
            match cloud_result {
                Ok(bytes) => return Ok((bytes, mime_from_key(key).to_string())),
                Err(e) => {
                    if track.inline_audio.is_some() {
                        tracing::warn!(
                            track_id = %track.track_id,
                            error = %e,
                            "cloud fetch failed; falling back to inline payload"
                        );
                    } else {
                        return Err(ApiError::ObjectUnreadable(key.clone()));
                    }
                }
            }
        }

        match self.metadata.get_inline_audio(track.track_id).await? {
            Some((payload, mime)) => Ok((
                Bytes::from(payload),
                mime.unwrap_or_else(|| "application/octet-stream".to_string()),
            )),
            None => Err(ApiError::NotFound(format!(
                "track {} has no audio",
                track.track_id
            ))),
        }
    }

    /// Open a cloud object as a byte stream, with its metadata. Streaming
    /// consumers must not buffer the object; the stream honors transport
    /// backpressure.
    pub async fn get_stream(&self, key: &str) -> ApiResult<(ByteStream, ObjectMeta)> {
        let cloud = self.cloud()?;
        let meta = self
            .cloud_op(cloud.head(key))
            .await
            .map_err(not_found_to_unreadable)?;
        let stream = self
            .cloud_op(cloud.get_stream(key))
            .await
            .map_err(not_found_to_unreadable)?;
        Ok((stream, meta))
    }

    /// Fetch one byte range of a cloud object, buffered. Used for ranged
    /// proxy playback; the backends cap range sizes.
    pub async fn get_range(&self, key: &str, start: u64, end: u64) -> ApiResult<Bytes> {
        let cloud = self.cloud()?;
        self.cloud_op(cloud.get_range(key, start, end))
            .await
            .map_err(not_found_to_unreadable)
    }

    /// Object metadata for a cloud key.
    pub async fn head(&self, key: &str) -> ApiResult<ObjectMeta> {
        let cloud = self.cloud()?;
        self.cloud_op(cloud.head(key))
            .await
            .map_err(not_found_to_unreadable)
    }

    /// A time-limited read URL, or `None` when the backend has no signing
    /// scheme (callers proxy instead).
    pub async fn signed_read_url(&self, key: &str) -> ApiResult<Option<String>> {
        let cloud = self.cloud()?;
        match self
            .cloud_op(cloud.signed_get_url(key, self.signed_url_ttl))
            .await
        {
            Ok(url) => Ok(Some(url)),
            Err(ApiError::Storage(StorageError::SignedUrlsUnsupported(_))) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Probe whether a cloud object is actually readable.
    ///
    /// Performs a genuine short-range byte fetch, never a metadata check: a
    /// bucket can report valid metadata for a corrupted or truncated object.
    /// A zero-byte read counts as unreadable.
    pub async fn probe_readable(&self, key: &str) -> bool {
        let Ok(cloud) = self.cloud() else {
            return false;
        };
        match self.cloud_op(cloud.get_range(key, 0, PROBE_LEN)).await {
            Ok(bytes) => !bytes.is_empty(),
            Err(e) => {
                tracing::debug!(key, error = %e, "readability probe failed");
                false
            }
        }
    }
}

fn unsupported_to_unavailable(e: ApiError) -> ApiError {
    match e {
        ApiError::Storage(StorageError::SignedUrlsUnsupported(_)) => ApiError::StorageUnavailable,
        other => other,
    }
}

fn not_found_to_unreadable(e: ApiError) -> ApiError {
    match e {
        ApiError::Storage(StorageError::NotFound(key)) => ApiError::ObjectUnreadable(key),
        other => other,
    }
}

/// Keep object keys shell- and URL-safe regardless of client filenames.
fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_KEY_FILENAME_LEN)
        .collect();

    if sanitized.trim_matches('_').is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

/// Infer a MIME type from an object key's extension. Cloud objects do not
/// carry their content type through every backend, and the transcription
/// provider sniffs containers from it.
fn mime_from_key(key: &str) -> &'static str {
    match key.rsplit('.').next().map(|ext| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "mp3" => "audio/mpeg",
        Some(ext) if ext == "wav" => "audio/wav",
        Some(ext) if ext == "ogg" || ext == "oga" => "audio/ogg",
        Some(ext) if ext == "flac" => "audio/flac",
        Some(ext) if ext == "m4a" || ext == "mp4" => "audio/mp4",
        Some(ext) if ext == "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my song.mp3"), "my_song.mp3");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("___"), "upload");
        assert_eq!(sanitize_filename(""), "upload");
        assert!(sanitize_filename(&"a".repeat(500)).len() <= MAX_KEY_FILENAME_LEN);
    }

    #[test]
    fn test_mime_from_key() {
        assert_eq!(mime_from_key("users/u/audio/x-song.mp3"), "audio/mpeg");
        assert_eq!(mime_from_key("a/b.WAV"), "audio/wav");
        assert_eq!(mime_from_key("no-extension"), "application/octet-stream");
    }
}

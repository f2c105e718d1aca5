//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<time::OffsetDateTime>,
    /// Content type (if available).
    pub content_type: Option<String>,
}

/// Object store abstraction over the external audio bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's size and content type without fetching content.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Get an object's content, fully buffered.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Get an object as a byte stream.
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Get a range of bytes from an object. `end` is exclusive. Ranges
    /// extending past the object's length are clamped, so the returned
    /// buffer may be shorter than requested; it is empty only when `start`
    /// is at or past the end of the object.
    async fn get_range(&self, key: &str, start: u64, end: u64) -> StorageResult<Bytes>;

    /// Put an object atomically.
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> StorageResult<()>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Generate a time-limited URL granting direct read access to one
    /// object. Backends without a signing scheme return
    /// `StorageError::SignedUrlsUnsupported`; callers fall back to proxying.
    async fn signed_get_url(&self, key: &str, ttl: Duration) -> StorageResult<String>;

    /// Generate a time-limited URL granting direct write access to one
    /// object, for browser-direct uploads.
    async fn signed_put_url(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> StorageResult<String>;

    /// Static identifier for the backend type (e.g., "s3", "filesystem").
    /// Used for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// Called during server startup so misconfiguration surfaces before the
    /// service accepts requests. The default implementation returns Ok(()),
    /// suitable for backends that need no connectivity check.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

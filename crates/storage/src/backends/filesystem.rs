//! Local filesystem storage backend.
//!
//! Serves as the bucket stand-in for tests and single-node deployments.
//! Presigned URLs are unsupported; playback falls back to proxying.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, ObjectMeta, ObjectStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

/// Chunk size for streaming reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Maximum range size for get_range operations (128 MiB).
/// Prevents large allocations from user-controlled range requests.
const MAX_RANGE_SIZE: u64 = 128 * 1024 * 1024;

/// Local filesystem object store.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Get the full path for a key, with path traversal protection.
    fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!(
                "path traversal not allowed: {key}"
            )));
        }

        // Every component must be a plain name (no roots, no `.`/`..`).
        for component in Path::new(key).components() {
            match component {
                std::path::Component::Normal(_) => {}
                _ => {
                    return Err(StorageError::InvalidKey(format!(
                        "contains unsafe path component: {key}"
                    )));
                }
            }
        }

        Ok(self.root.join(key))
    }

    /// Ensure parent directory exists.
    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn map_open_error(key: &str, e: std::io::Error) -> StorageError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key)?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key)?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| Self::map_open_error(key, e))?;

        Ok(ObjectMeta {
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(|t| t.into()),
            content_type: None,
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key)?;
        let data = fs::read(&path)
            .await
            .map_err(|e| Self::map_open_error(key, e))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let path = self.key_path(key)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| Self::map_open_error(key, e))?;

        // Stream the file in chunks instead of loading entirely into memory.
        let reader_stream = ReaderStream::with_capacity(file, STREAM_CHUNK_SIZE);

        use futures::StreamExt;
        let stream = reader_stream.map(|result| result.map_err(StorageError::Io));

        Ok(Box::pin(stream))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_range(&self, key: &str, start: u64, end: u64) -> StorageResult<Bytes> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        if end < start {
            return Err(StorageError::InvalidRange(format!(
                "end ({}) < start ({})",
                end, start
            )));
        }

        if end - start > MAX_RANGE_SIZE {
            return Err(StorageError::InvalidRange(format!(
                "range size {} exceeds maximum {} bytes",
                end - start,
                MAX_RANGE_SIZE
            )));
        }

        let path = self.key_path(key)?;
        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| Self::map_open_error(key, e))?;

        // Clamp to the object's length, matching S3 range semantics.
        let object_len = file.metadata().await?.len();
        let start = start.min(object_len);
        let end = end.min(object_len);

        let len = usize::try_from(end - start).map_err(|_| {
            StorageError::InvalidRange(format!(
                "range size {} exceeds platform address space",
                end - start
            ))
        })?;

        file.seek(std::io::SeekFrom::Start(start)).await?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).await?;

        Ok(Bytes::from(buf))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes, _content_type: Option<&str>) -> StorageResult<()> {
        let path = self.key_path(key)?;
        self.ensure_parent(&path).await?;

        // Write to a uniquely named temp file, fsync, then rename, so
        // concurrent writers of the same key never expose partial content.
        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        let temp_path = path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        );
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn signed_get_url(&self, _key: &str, _ttl: Duration) -> StorageResult<String> {
        Err(StorageError::SignedUrlsUnsupported("filesystem"))
    }

    async fn signed_put_url(
        &self,
        _key: &str,
        _content_type: &str,
        _ttl: Duration,
    ) -> StorageResult<String> {
        Err(StorageError::SignedUrlsUnsupported("filesystem"))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use tempfile::tempdir;

    async fn make_backend() -> (tempfile::TempDir, FilesystemBackend) {
        let temp = tempdir().unwrap();
        let backend = FilesystemBackend::new(temp.path()).await.unwrap();
        (temp, backend)
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let (_temp, backend) = make_backend().await;
        backend
            .put("users/u1/audio/a.mp3", Bytes::from_static(b"abc"), None)
            .await
            .unwrap();

        let data = backend.get("users/u1/audio/a.mp3").await.unwrap();
        assert_eq!(&data[..], b"abc");
        assert!(backend.exists("users/u1/audio/a.mp3").await.unwrap());
        assert!(!backend.exists("users/u1/audio/b.mp3").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_temp, backend) = make_backend().await;
        let err = backend.get("nope").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_range_clamps_to_length() {
        let (_temp, backend) = make_backend().await;
        backend
            .put("a", Bytes::from_static(b"0123456789"), None)
            .await
            .unwrap();

        let data = backend.get_range("a", 2, 6).await.unwrap();
        assert_eq!(&data[..], b"2345");

        // Past-EOF end clamps instead of erroring.
        let data = backend.get_range("a", 4, 1024).await.unwrap();
        assert_eq!(&data[..], b"456789");

        // Start past EOF yields an empty read.
        let data = backend.get_range("a", 100, 200).await.unwrap();
        assert!(data.is_empty());

        assert!(backend.get_range("a", 6, 4).await.is_err());
    }

    #[tokio::test]
    async fn test_get_stream_yields_full_object() {
        let (_temp, backend) = make_backend().await;
        let payload = vec![7u8; STREAM_CHUNK_SIZE * 2 + 17];
        backend
            .put("big", Bytes::from(payload.clone()), None)
            .await
            .unwrap();

        let stream = backend.get_stream("big").await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        let collected: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(collected, payload);
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (_temp, backend) = make_backend().await;
        for key in ["../escape", "/abs", "a/../../b", ""] {
            assert!(
                matches!(
                    backend.get(key).await.unwrap_err(),
                    StorageError::InvalidKey(_)
                ),
                "key {key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_temp, backend) = make_backend().await;
        backend
            .put("x", Bytes::from_static(b"x"), None)
            .await
            .unwrap();
        backend.delete("x").await.unwrap();
        backend.delete("x").await.unwrap();
        assert!(!backend.exists("x").await.unwrap());
    }

    #[tokio::test]
    async fn test_signed_urls_unsupported() {
        let (_temp, backend) = make_backend().await;
        let err = backend
            .signed_get_url("x", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::SignedUrlsUnsupported(_)));
    }
}

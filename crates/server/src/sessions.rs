//! In-memory chunked upload session store.
//!
//! Sessions model bytes in flight, not an audit log: they are process-local,
//! never persisted, and reaped wholesale after a fixed TTL. A client whose
//! session is reaped restarts the chunked upload flow. A horizontally scaled
//! deployment must pin one session's chunk traffic to one instance.

use crate::error::{ApiError, ApiResult};
use bytes::{Bytes, BytesMut};
use soundpost_core::track::TrackId;
use soundpost_core::upload::{ChunkStatus, SessionId};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// One chunked upload in progress.
#[derive(Debug)]
pub struct ChunkedSession {
    pub session_id: SessionId,
    pub owner_id: Uuid,
    /// The pre-created track row this session will fill on finalize.
    pub track_id: TrackId,
    pub total_chunks: u32,
    pub declared_size: u64,
    pub mime_type: String,
    /// Received chunks, keyed by index. Arrival order is irrelevant; only
    /// index order at assembly time matters.
    chunks: BTreeMap<u32, Bytes>,
    created_at: Instant,
}

impl ChunkedSession {
    /// Create a new session for a pre-created track.
    pub fn new(
        owner_id: Uuid,
        track_id: TrackId,
        total_chunks: u32,
        declared_size: u64,
        mime_type: String,
    ) -> Self {
        Self {
            session_id: SessionId::new(),
            owner_id,
            track_id,
            total_chunks,
            declared_size,
            mime_type,
            chunks: BTreeMap::new(),
            created_at: Instant::now(),
        }
    }

    /// Number of distinct chunk indices received.
    pub fn received(&self) -> u32 {
        self.chunks.len() as u32
    }

    /// Complete iff every index in `[0, total_chunks)` is present. Because
    /// indices outside that range are rejected at submission, a full map
    /// implies full coverage.
    pub fn is_complete(&self) -> bool {
        self.chunks.len() as u32 == self.total_chunks
    }

    /// The lowest index not yet received.
    pub fn first_missing_index(&self) -> Option<u32> {
        (0..self.total_chunks).find(|index| !self.chunks.contains_key(index))
    }

    /// Total bytes received so far.
    pub fn received_bytes(&self) -> u64 {
        self.chunks.values().map(|c| c.len() as u64).sum()
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }

    /// Store or overwrite a chunk. Overwriting the same index is the
    /// idempotent-retry path.
    fn put(&mut self, index: u32, payload: Bytes) -> ApiResult<ChunkStatus> {
        if index >= self.total_chunks {
            return Err(ApiError::BadRequest(format!(
                "chunk index {} out of range (session declared {} chunks)",
                index, self.total_chunks
            )));
        }
        self.chunks.insert(index, payload);
        Ok(ChunkStatus {
            received: self.received(),
            total: self.total_chunks,
            complete: self.is_complete(),
        })
    }

    /// Concatenate all chunks in index order into one payload.
    pub fn assemble(self) -> Bytes {
        let mut assembled = BytesMut::with_capacity(self.received_bytes() as usize);
        for (_, chunk) in self.chunks {
            assembled.extend_from_slice(&chunk);
        }
        assembled.freeze()
    }
}

/// Process-local store for chunked upload sessions.
///
/// A single async mutex guards the keyed map; chunk submissions for
/// different indices of the same session serialize through it, which is
/// sufficient because per-chunk work under the lock is a map insert.
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<SessionId, ChunkedSession>>,
}

impl SessionStore {
    /// Create a new store with the given session TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new session, returning its ID.
    pub async fn insert(&self, session: ChunkedSession) -> SessionId {
        let session_id = session.session_id;
        self.sessions.lock().await.insert(session_id, session);
        session_id
    }

    /// Store a chunk. Expired sessions are treated as absent: the expiry
    /// check here makes reaping deterministic for callers between sweeps.
    pub async fn put_chunk(
        &self,
        session_id: SessionId,
        owner_id: Uuid,
        index: u32,
        payload: Bytes,
    ) -> ApiResult<ChunkStatus> {
        let mut sessions = self.sessions.lock().await;

        if sessions
            .get(&session_id)
            .is_some_and(|s| s.is_expired(self.ttl))
        {
            sessions.remove(&session_id);
        }

        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))?;

        if session.owner_id != owner_id {
            return Err(ApiError::Forbidden(
                "session belongs to another user".to_string(),
            ));
        }

        session.put(index, payload)
    }

    /// Consume a complete session for finalize. Incomplete sessions are left
    /// in place and the first missing index is reported, so the client can
    /// resubmit and retry finalize.
    pub async fn take_complete(
        &self,
        session_id: SessionId,
        owner_id: Uuid,
    ) -> ApiResult<ChunkedSession> {
        let mut sessions = self.sessions.lock().await;

        if sessions
            .get(&session_id)
            .is_some_and(|s| s.is_expired(self.ttl))
        {
            sessions.remove(&session_id);
        }

        let session = sessions
            .get(&session_id)
            .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))?;

        if session.owner_id != owner_id {
            return Err(ApiError::Forbidden(
                "session belongs to another user".to_string(),
            ));
        }

        if let Some(missing_index) = session.first_missing_index() {
            return Err(ApiError::IncompleteUpload { missing_index });
        }

        sessions
            .remove(&session_id)
            .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))
    }

    /// Delete every session older than the TTL, complete or not. Returns the
    /// number reaped. Reaping a session mid-upload is an accepted race; the
    /// client restarts.
    pub async fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.ttl));
        before - sessions.len()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Spawn the periodic TTL sweep. Runs until the returned handle is
    /// dropped or aborted; independent of request traffic.
    pub fn spawn_sweeper(self: std::sync::Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let reaped = self.sweep_expired().await;
                if reaped > 0 {
                    crate::metrics::UPLOAD_SESSIONS_REAPED.inc_by(reaped as u64);
                    tracing::info!(reaped, "reaped expired upload sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn session(owner: Uuid, total: u32) -> ChunkedSession {
        ChunkedSession::new(owner, TrackId::new(), total, 1024, "audio/mpeg".into())
    }

    #[tokio::test]
    async fn test_assembly_is_order_invariant() {
        let owner = Uuid::new_v4();
        let store = SessionStore::new(HOUR);

        // Submit 1, 0, 2 out of order.
        let id = store.insert(session(owner, 3)).await;
        for (index, payload) in [(1u32, "B"), (0, "A"), (2, "C")] {
            store
                .put_chunk(id, owner, index, Bytes::from(payload))
                .await
                .unwrap();
        }
        let out_of_order = store.take_complete(id, owner).await.unwrap().assemble();

        // Submit 0, 1, 2 in order.
        let id = store.insert(session(owner, 3)).await;
        for (index, payload) in [(0u32, "A"), (1, "B"), (2, "C")] {
            store
                .put_chunk(id, owner, index, Bytes::from(payload))
                .await
                .unwrap();
        }
        let in_order = store.take_complete(id, owner).await.unwrap().assemble();

        assert_eq!(&out_of_order[..], b"ABC");
        assert_eq!(out_of_order, in_order);
    }

    #[tokio::test]
    async fn test_resubmission_overwrites() {
        let owner = Uuid::new_v4();
        let store = SessionStore::new(HOUR);
        let id = store.insert(session(owner, 2)).await;

        let status = store
            .put_chunk(id, owner, 0, Bytes::from_static(b"A"))
            .await
            .unwrap();
        assert_eq!(status.received, 1);
        assert!(!status.complete);

        // Same index again: received count unchanged.
        let status = store
            .put_chunk(id, owner, 0, Bytes::from_static(b"A"))
            .await
            .unwrap();
        assert_eq!(status.received, 1);

        let status = store
            .put_chunk(id, owner, 1, Bytes::from_static(b"B"))
            .await
            .unwrap();
        assert!(status.complete);

        let assembled = store.take_complete(id, owner).await.unwrap().assemble();
        assert_eq!(&assembled[..], b"AB");
    }

    #[tokio::test]
    async fn test_finalize_names_first_missing_index() {
        let owner = Uuid::new_v4();
        let store = SessionStore::new(HOUR);
        let id = store.insert(session(owner, 5)).await;

        for index in [0u32, 1, 3] {
            store
                .put_chunk(id, owner, index, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }

        let err = store.take_complete(id, owner).await.unwrap_err();
        match err {
            ApiError::IncompleteUpload { missing_index } => assert_eq!(missing_index, 2),
            other => panic!("unexpected error: {other:?}"),
        }

        // The session survives a failed finalize.
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_index_rejected() {
        let owner = Uuid::new_v4();
        let store = SessionStore::new(HOUR);
        let id = store.insert(session(owner, 2)).await;

        let err = store
            .put_chunk(id, owner, 2, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_foreign_owner_forbidden() {
        let owner = Uuid::new_v4();
        let store = SessionStore::new(HOUR);
        let id = store.insert(session(owner, 1)).await;

        let err = store
            .put_chunk(id, Uuid::new_v4(), 0, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_expired_session_absent_even_when_fully_received() {
        let owner = Uuid::new_v4();
        let store = SessionStore::new(Duration::ZERO);
        let id = store.insert(session(owner, 1)).await;

        // Everything is instantly expired with a zero TTL.
        tokio::time::sleep(Duration::from_millis(5)).await;

        let err = store
            .put_chunk(id, owner, 0, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SessionNotFound(_)));

        let err = store.take_complete(id, owner).await.unwrap_err();
        assert!(matches!(err, ApiError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_sweep_reaps_only_expired() {
        let owner = Uuid::new_v4();
        let store = SessionStore::new(Duration::ZERO);
        store.insert(session(owner, 1)).await;
        store.insert(session(owner, 1)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(store.sweep_expired().await, 2);
        assert!(store.is_empty().await);

        let fresh_store = SessionStore::new(HOUR);
        fresh_store.insert(session(owner, 1)).await;
        assert_eq!(fresh_store.sweep_expired().await, 0);
        assert_eq!(fresh_store.len().await, 1);
    }
}

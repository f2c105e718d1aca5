//! Metadata store trait and SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{
    AnalysisUpdate, CloudTrackRef, RemovedTrack, TokenRow, TrackRow, TrackSummaryRow, TrackUpdate,
};
use crate::repos::{TokenRepo, TrackRepo};
use async_trait::async_trait;
use soundpost_core::track::TranscriptionState;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: TrackRepo + TokenRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store and run migrations.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids persistent "database is locked" failures under axum
            // concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    fn parse_state(raw: &str) -> MetadataResult<TranscriptionState> {
        TranscriptionState::parse(raw)
            .map_err(|e| MetadataError::Internal(format!("corrupt transcription state: {e}")))
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS tracks (
                track_id            BLOB PRIMARY KEY,
                owner_id            BLOB NOT NULL,
                title               TEXT NOT NULL,
                artist              TEXT,
                album               TEXT,
                duration_secs       REAL,
                cover_url           TEXT,
                inline_audio        BLOB,
                inline_mime         TEXT,
                object_key          TEXT,
                transcription_state TEXT NOT NULL DEFAULT 'pending',
                transcript_text     TEXT,
                transcript_timings  TEXT,
                transcript_language TEXT,
                transcript_error    TEXT,
                tempo_bpm           REAL,
                musical_key         TEXT,
                energy              REAL,
                analyzed_at         TEXT,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_tracks_owner ON tracks(owner_id)",
            "CREATE INDEX IF NOT EXISTS idx_tracks_owner_cloud
                 ON tracks(owner_id) WHERE object_key IS NOT NULL",
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                token_id    BLOB PRIMARY KEY,
                user_id     BLOB NOT NULL,
                token_hash  TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at  TEXT NOT NULL,
                revoked_at  TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_tokens_hash ON tokens(token_hash)",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Column list for summary queries; computes `has_inline_audio` so the blob
/// itself never leaves the database for listings.
const SUMMARY_COLUMNS: &str = "track_id, owner_id, title, artist, album, duration_secs, \
     cover_url, inline_audio IS NOT NULL AS has_inline_audio, object_key, \
     transcription_state, transcript_text IS NOT NULL AS has_transcript, \
     tempo_bpm, musical_key, energy, created_at";

#[async_trait]
impl TrackRepo for SqliteStore {
    async fn create_track(&self, track: &TrackRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tracks (
                track_id, owner_id, title, artist, album, duration_secs, cover_url,
                inline_audio, inline_mime, object_key,
                transcription_state, transcript_text, transcript_timings,
                transcript_language, transcript_error,
                tempo_bpm, musical_key, energy, analyzed_at,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(track.track_id)
        .bind(track.owner_id)
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(track.duration_secs)
        .bind(&track.cover_url)
        .bind(&track.inline_audio)
        .bind(&track.inline_mime)
        .bind(&track.object_key)
        .bind(&track.transcription_state)
        .bind(&track.transcript_text)
        .bind(&track.transcript_timings)
        .bind(&track.transcript_language)
        .bind(&track.transcript_error)
        .bind(track.tempo_bpm)
        .bind(&track.musical_key)
        .bind(track.energy)
        .bind(track.analyzed_at)
        .bind(track.created_at)
        .bind(track.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_track(&self, track_id: Uuid) -> MetadataResult<Option<TrackRow>> {
        let row = sqlx::query_as::<_, TrackRow>("SELECT * FROM tracks WHERE track_id = ?")
            .bind(track_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_track_for_owner(
        &self,
        track_id: Uuid,
        owner_id: Uuid,
    ) -> MetadataResult<Option<TrackRow>> {
        let row = sqlx::query_as::<_, TrackRow>(
            "SELECT * FROM tracks WHERE track_id = ? AND owner_id = ?",
        )
        .bind(track_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_tracks(&self, owner_id: Uuid) -> MetadataResult<Vec<TrackSummaryRow>> {
        let rows = sqlx::query_as::<_, TrackSummaryRow>(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM tracks WHERE owner_id = ? ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_track(
        &self,
        track_id: Uuid,
        owner_id: Uuid,
        update: &TrackUpdate,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tracks SET
                title = COALESCE(?, title),
                artist = COALESCE(?, artist),
                album = COALESCE(?, album),
                duration_secs = COALESCE(?, duration_secs),
                cover_url = COALESCE(?, cover_url),
                updated_at = ?
            WHERE track_id = ? AND owner_id = ?
            "#,
        )
        .bind(&update.title)
        .bind(&update.artist)
        .bind(&update.album)
        .bind(update.duration_secs)
        .bind(&update.cover_url)
        .bind(updated_at)
        .bind(track_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("track {track_id}")));
        }
        Ok(())
    }

    async fn update_analysis(
        &self,
        track_id: Uuid,
        owner_id: Uuid,
        update: &AnalysisUpdate,
        analyzed_at: OffsetDateTime,
    ) -> MetadataResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tracks SET
                tempo_bpm = COALESCE(?, tempo_bpm),
                musical_key = COALESCE(?, musical_key),
                energy = COALESCE(?, energy),
                analyzed_at = ?,
                updated_at = ?
            WHERE track_id = ? AND owner_id = ?
            "#,
        )
        .bind(update.tempo_bpm)
        .bind(&update.musical_key)
        .bind(update.energy)
        .bind(analyzed_at)
        .bind(analyzed_at)
        .bind(track_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("track {track_id}")));
        }
        Ok(())
    }

    async fn set_inline_audio(
        &self,
        track_id: Uuid,
        payload: &[u8],
        mime_type: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()> {
        // Pointer exclusivity: setting inline clears any cloud key.
        let result = sqlx::query(
            r#"
            UPDATE tracks SET
                inline_audio = ?, inline_mime = ?, object_key = NULL, updated_at = ?
            WHERE track_id = ?
            "#,
        )
        .bind(payload)
        .bind(mime_type)
        .bind(updated_at)
        .bind(track_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("track {track_id}")));
        }
        Ok(())
    }

    async fn set_object_key(
        &self,
        track_id: Uuid,
        object_key: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()> {
        // Pointer exclusivity: setting the cloud key clears any inline blob.
        let result = sqlx::query(
            r#"
            UPDATE tracks SET
                object_key = ?, inline_audio = NULL, inline_mime = NULL, updated_at = ?
            WHERE track_id = ?
            "#,
        )
        .bind(object_key)
        .bind(updated_at)
        .bind(track_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("track {track_id}")));
        }
        Ok(())
    }

    async fn get_inline_audio(
        &self,
        track_id: Uuid,
    ) -> MetadataResult<Option<(Vec<u8>, Option<String>)>> {
        let row: Option<(Option<Vec<u8>>, Option<String>)> =
            sqlx::query_as("SELECT inline_audio, inline_mime FROM tracks WHERE track_id = ?")
                .bind(track_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match row {
            Some((Some(payload), mime)) => Some((payload, mime)),
            _ => None,
        })
    }

    async fn begin_transcription(
        &self,
        track_id: Uuid,
        force: bool,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()> {
        // Read-validate-write in one transaction; the single-connection pool
        // serializes writers so the transition check cannot race.
        let mut tx = self.pool.begin().await?;

        let raw: Option<String> =
            sqlx::query_scalar("SELECT transcription_state FROM tracks WHERE track_id = ?")
                .bind(track_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(raw) = raw else {
            return Err(MetadataError::NotFound(format!("track {track_id}")));
        };

        let state = Self::parse_state(&raw)?;
        if !state.can_begin_processing(force) {
            return Err(MetadataError::InvalidStateTransition {
                from: raw,
                to: TranscriptionState::Processing.as_str().to_string(),
            });
        }

        sqlx::query(
            "UPDATE tracks SET transcription_state = 'processing', transcript_error = NULL, \
             updated_at = ? WHERE track_id = ?",
        )
        .bind(updated_at)
        .bind(track_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn complete_transcription(
        &self,
        track_id: Uuid,
        text: &str,
        timings_json: &str,
        language: Option<&str>,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tracks SET
                transcription_state = 'completed',
                transcript_text = ?,
                transcript_timings = ?,
                transcript_language = ?,
                transcript_error = NULL,
                updated_at = ?
            WHERE track_id = ?
            "#,
        )
        .bind(text)
        .bind(timings_json)
        .bind(language)
        .bind(updated_at)
        .bind(track_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("track {track_id}")));
        }
        Ok(())
    }

    async fn fail_transcription(
        &self,
        track_id: Uuid,
        error: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()> {
        let result = sqlx::query(
            "UPDATE tracks SET transcription_state = 'failed', transcript_error = ?, \
             updated_at = ? WHERE track_id = ?",
        )
        .bind(error)
        .bind(updated_at)
        .bind(track_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("track {track_id}")));
        }
        Ok(())
    }

    async fn list_transcribable_tracks(&self, owner_id: Uuid) -> MetadataResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT track_id FROM tracks
            WHERE owner_id = ?
              AND (inline_audio IS NOT NULL OR object_key IS NOT NULL)
              AND transcription_state != 'processing'
              AND transcript_text IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn list_cloud_tracks(&self, owner_id: Uuid) -> MetadataResult<Vec<CloudTrackRef>> {
        let rows = sqlx::query_as::<_, CloudTrackRef>(
            "SELECT track_id, title, object_key FROM tracks \
             WHERE owner_id = ? AND object_key IS NOT NULL ORDER BY created_at ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_track(&self, track_id: Uuid, owner_id: Uuid) -> MetadataResult<bool> {
        let result = sqlx::query("DELETE FROM tracks WHERE track_id = ? AND owner_id = ?")
            .bind(track_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_tracks_missing_audio(
        &self,
        owner_id: Uuid,
    ) -> MetadataResult<Vec<RemovedTrack>> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query_as::<_, RemovedTrack>(
            "SELECT track_id, title FROM tracks \
             WHERE owner_id = ? AND inline_audio IS NULL AND object_key IS NULL",
        )
        .bind(owner_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM tracks \
             WHERE owner_id = ? AND inline_audio IS NULL AND object_key IS NULL",
        )
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn delete_tracks_by_id(&self, track_ids: &[Uuid]) -> MetadataResult<u64> {
        if track_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut deleted = 0u64;
        for track_id in track_ids {
            let result = sqlx::query("DELETE FROM tracks WHERE track_id = ?")
                .bind(track_id)
                .execute(&mut *tx)
                .await?;
            deleted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(deleted)
    }
}

#[async_trait]
impl TokenRepo for SqliteStore {
    async fn create_token(&self, token: &TokenRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tokens (token_id, user_id, token_hash, description, created_at, revoked_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(token.token_id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(&token.description)
        .bind(token.created_at)
        .bind(token.revoked_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                MetadataError::Constraint(format!("token hash already exists: {db}"))
            }
            other => MetadataError::Database(other),
        })?;
        Ok(())
    }

    async fn get_token_by_hash(&self, token_hash: &str) -> MetadataResult<Option<TokenRow>> {
        let row = sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn revoke_token(&self, token_id: Uuid, revoked_at: OffsetDateTime) -> MetadataResult<()> {
        let result = sqlx::query("UPDATE tokens SET revoked_at = ? WHERE token_id = ?")
            .bind(revoked_at)
            .bind(token_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("token {token_id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn make_store() -> (tempfile::TempDir, SqliteStore) {
        let temp = tempdir().unwrap();
        let store = SqliteStore::new(temp.path().join("metadata.db"))
            .await
            .unwrap();
        (temp, store)
    }

    fn pending_track(owner_id: Uuid) -> TrackRow {
        let now = OffsetDateTime::now_utc();
        TrackRow {
            track_id: Uuid::new_v4(),
            owner_id,
            title: "Test Song".to_string(),
            artist: Some("Tester".to_string()),
            album: None,
            duration_secs: Some(12.5),
            cover_url: None,
            inline_audio: None,
            inline_mime: None,
            object_key: None,
            transcription_state: "pending".to_string(),
            transcript_text: None,
            transcript_timings: None,
            transcript_language: None,
            transcript_error: None,
            tempo_bpm: None,
            musical_key: None,
            energy: None,
            analyzed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_pointer_exclusivity_survives_roundtrips() {
        let (_temp, store) = make_store().await;
        let owner = Uuid::new_v4();
        let track = pending_track(owner);
        store.create_track(&track).await.unwrap();

        let now = OffsetDateTime::now_utc();
        store
            .set_inline_audio(track.track_id, b"audio-bytes", "audio/mpeg", now)
            .await
            .unwrap();

        let row = store.get_track(track.track_id).await.unwrap().unwrap();
        assert!(row.inline_audio.is_some());
        assert!(row.object_key.is_none());

        store
            .set_object_key(track.track_id, "users/x/a.mp3", now)
            .await
            .unwrap();

        let row = store.get_track(track.track_id).await.unwrap().unwrap();
        assert!(row.inline_audio.is_none());
        assert!(row.inline_mime.is_none());
        assert_eq!(row.object_key.as_deref(), Some("users/x/a.mp3"));

        store
            .set_inline_audio(track.track_id, b"back-again", "audio/wav", now)
            .await
            .unwrap();

        let row = store.get_track(track.track_id).await.unwrap().unwrap();
        assert!(row.inline_audio.is_some());
        assert!(row.object_key.is_none());
    }

    #[tokio::test]
    async fn test_transcription_state_machine() {
        let (_temp, store) = make_store().await;
        let track = pending_track(Uuid::new_v4());
        store.create_track(&track).await.unwrap();
        let now = OffsetDateTime::now_utc();

        // pending -> processing -> completed
        store
            .begin_transcription(track.track_id, false, now)
            .await
            .unwrap();

        // processing -> processing without force is rejected
        let err = store
            .begin_transcription(track.track_id, false, now)
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidStateTransition { .. }));

        store
            .complete_transcription(track.track_id, "hello", "{}", Some("en"), now)
            .await
            .unwrap();

        // completed is terminal without force
        let err = store
            .begin_transcription(track.track_id, false, now)
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidStateTransition { .. }));

        // explicit re-transcription re-enters processing
        store
            .begin_transcription(track.track_id, true, now)
            .await
            .unwrap();

        // failed is retryable without force
        store
            .fail_transcription(track.track_id, "provider exploded", now)
            .await
            .unwrap();
        store
            .begin_transcription(track.track_id, false, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transcribable_selection_skips_processing_and_done() {
        let (_temp, store) = make_store().await;
        let owner = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let mut with_audio = pending_track(owner);
        with_audio.inline_audio = Some(b"x".to_vec());
        with_audio.inline_mime = Some("audio/mpeg".to_string());
        store.create_track(&with_audio).await.unwrap();

        let no_audio = pending_track(owner);
        store.create_track(&no_audio).await.unwrap();

        let mut processing = pending_track(owner);
        processing.inline_audio = Some(b"y".to_vec());
        store.create_track(&processing).await.unwrap();
        store
            .begin_transcription(processing.track_id, false, now)
            .await
            .unwrap();

        let mut done = pending_track(owner);
        done.inline_audio = Some(b"z".to_vec());
        store.create_track(&done).await.unwrap();
        store
            .begin_transcription(done.track_id, false, now)
            .await
            .unwrap();
        store
            .complete_transcription(done.track_id, "text", "{}", None, now)
            .await
            .unwrap();

        let ids = store.list_transcribable_tracks(owner).await.unwrap();
        assert_eq!(ids, vec![with_audio.track_id]);
    }

    #[tokio::test]
    async fn test_delete_tracks_missing_audio() {
        let (_temp, store) = make_store().await;
        let owner = Uuid::new_v4();

        let empty = pending_track(owner);
        store.create_track(&empty).await.unwrap();

        let mut full = pending_track(owner);
        full.inline_audio = Some(b"x".to_vec());
        store.create_track(&full).await.unwrap();

        let removed = store.delete_tracks_missing_audio(owner).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].track_id, empty.track_id);

        assert!(store.get_track(empty.track_id).await.unwrap().is_none());
        assert!(store.get_track(full.track_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_owner_scoping_hides_foreign_tracks() {
        let (_temp, store) = make_store().await;
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let track = pending_track(owner);
        store.create_track(&track).await.unwrap();

        assert!(
            store
                .get_track_for_owner(track.track_id, stranger)
                .await
                .unwrap()
                .is_none()
        );
        assert!(!store.delete_track(track.track_id, stranger).await.unwrap());
        assert!(store.get_track(track.track_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_token_lookup_and_revocation() {
        let (_temp, store) = make_store().await;
        let token = TokenRow {
            token_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "abc123".to_string(),
            description: Some("test".to_string()),
            created_at: OffsetDateTime::now_utc(),
            revoked_at: None,
        };
        store.create_token(&token).await.unwrap();

        let found = store.get_token_by_hash("abc123").await.unwrap().unwrap();
        assert_eq!(found.user_id, token.user_id);
        assert!(store.get_token_by_hash("missing").await.unwrap().is_none());

        store
            .revoke_token(token.token_id, OffsetDateTime::now_utc())
            .await
            .unwrap();
        let found = store.get_token_by_hash("abc123").await.unwrap().unwrap();
        assert!(found.revoked_at.is_some());
    }
}

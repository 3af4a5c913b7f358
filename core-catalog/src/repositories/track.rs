//! Track repository trait and SQLite implementation

use crate::error::{CatalogError, Result};
use crate::models::Track;
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Track repository interface for data access operations
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Find a track by its path-derived identity
    ///
    /// # Returns
    /// - `Ok(Some(track))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if a database error occurs
    async fn find_by_id(&self, id: &str) -> Result<Option<Track>>;

    /// Find a track by its normalized source path
    async fn find_by_path(&self, path: &str) -> Result<Option<Track>>;

    /// Find a track by its external (manifest) identifier
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Track>>;

    /// Insert a new track
    ///
    /// # Errors
    /// Returns an error if a track with the same identity already exists,
    /// validation fails, or a database error occurs.
    async fn insert(&self, track: &Track) -> Result<()>;

    /// Update an existing track
    ///
    /// # Errors
    /// Returns an error if the track does not exist, validation fails, or a
    /// database error occurs.
    async fn update(&self, track: &Track) -> Result<()>;

    /// Delete a track by identity
    ///
    /// # Returns
    /// - `Ok(true)` if the track was deleted
    /// - `Ok(false)` if the track was not found
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Delete every track whose path starts with the given prefix
    ///
    /// # Returns
    /// The number of rows removed.
    async fn delete_by_path_prefix(&self, prefix: &str) -> Result<u64>;

    /// All persisted track identities
    async fn all_ids(&self) -> Result<Vec<String>>;

    /// Distinct album ids referenced by any track
    async fn referenced_album_ids(&self) -> Result<Vec<String>>;

    /// Distinct artist ids referenced by any track, as primary or album
    /// artist
    async fn referenced_artist_ids(&self) -> Result<Vec<String>>;

    /// Count total tracks
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of TrackRepository
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    /// Create a new SQLite track repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrackRepository for SqliteTrackRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Track>> {
        let track = query_as::<_, Track>("SELECT * FROM tracks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(track)
    }

    async fn find_by_path(&self, path: &str) -> Result<Option<Track>> {
        let track = query_as::<_, Track>("SELECT * FROM tracks WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        Ok(track)
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Track>> {
        let track = query_as::<_, Track>("SELECT * FROM tracks WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(track)
    }

    async fn insert(&self, track: &Track) -> Result<()> {
        track.validate().map_err(|msg| CatalogError::InvalidInput {
            field: "track".to_string(),
            message: msg,
        })?;

        sqlx::query(
            r#"
            INSERT INTO tracks (
                id, path, title, artist_id, album_artist_id, album_id,
                duration_ms, track_number, lyrics, artwork_id,
                mtime, external_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&track.id)
        .bind(&track.path)
        .bind(&track.title)
        .bind(&track.artist_id)
        .bind(&track.album_artist_id)
        .bind(&track.album_id)
        .bind(track.duration_ms)
        .bind(track.track_number)
        .bind(&track.lyrics)
        .bind(&track.artwork_id)
        .bind(track.mtime)
        .bind(&track.external_id)
        .bind(track.created_at)
        .bind(track.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, track: &Track) -> Result<()> {
        track.validate().map_err(|msg| CatalogError::InvalidInput {
            field: "track".to_string(),
            message: msg,
        })?;

        let result = sqlx::query(
            r#"
            UPDATE tracks SET
                path = ?, title = ?, artist_id = ?, album_artist_id = ?,
                album_id = ?, duration_ms = ?, track_number = ?, lyrics = ?,
                artwork_id = ?, mtime = ?, external_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&track.path)
        .bind(&track.title)
        .bind(&track.artist_id)
        .bind(&track.album_artist_id)
        .bind(&track.album_id)
        .bind(track.duration_ms)
        .bind(track.track_number)
        .bind(&track.lyrics)
        .bind(&track.artwork_id)
        .bind(track.mtime)
        .bind(&track.external_id)
        .bind(track.updated_at)
        .bind(&track.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound {
                entity_type: "Track".to_string(),
                id: track.id.clone(),
            });
        }

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tracks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_path_prefix(&self, prefix: &str) -> Result<u64> {
        // substr comparison instead of LIKE avoids wildcard escaping in paths
        let result = sqlx::query("DELETE FROM tracks WHERE substr(path, 1, length(?)) = ?")
            .bind(prefix)
            .bind(prefix)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn all_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<(String,)> = query_as("SELECT id FROM tracks")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn referenced_album_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<(String,)> = query_as("SELECT DISTINCT album_id FROM tracks")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn referenced_artist_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<(String,)> = query_as(
            r#"
            SELECT DISTINCT artist_id FROM tracks
            UNION
            SELECT DISTINCT album_artist_id FROM tracks
                WHERE album_artist_id IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = query_as("SELECT COUNT(*) FROM tracks")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

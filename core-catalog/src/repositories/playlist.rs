//! Playlist repository trait and SQLite implementation

use crate::error::{CatalogError, Result};
use crate::models::Playlist;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Playlist repository interface for data access operations
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// Find a playlist by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Playlist>>;

    /// Find a user's playlist by its external (manifest) identifier
    async fn find_by_external_id(
        &self,
        user_id: &str,
        external_id: &str,
    ) -> Result<Option<Playlist>>;

    /// Insert a new playlist
    async fn insert(&self, playlist: &Playlist) -> Result<()>;

    /// Update an existing playlist
    async fn update(&self, playlist: &Playlist) -> Result<()>;

    /// Delete a playlist by ID, including its membership rows
    ///
    /// # Returns
    /// - `Ok(true)` if the playlist was deleted
    /// - `Ok(false)` if the playlist was not found
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Attach a track to a playlist at the given position
    async fn add_track(&self, playlist_id: &str, track_id: &str, position: i32) -> Result<()>;

    /// Detach a track from a playlist
    ///
    /// # Returns
    /// - `Ok(true)` if the membership row was removed
    /// - `Ok(false)` if the track was not in the playlist
    async fn remove_track(&self, playlist_id: &str, track_id: &str) -> Result<bool>;

    /// Track ids in a playlist, ordered by position
    async fn track_ids(&self, playlist_id: &str) -> Result<Vec<String>>;

    /// All of a user's manifest-origin playlists (external id present)
    async fn manifest_playlists(&self, user_id: &str) -> Result<Vec<Playlist>>;

    /// Count total playlists
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of PlaylistRepository
pub struct SqlitePlaylistRepository {
    pool: SqlitePool,
}

impl SqlitePlaylistRepository {
    /// Create a new SQLite playlist repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaylistRepository for SqlitePlaylistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Playlist>> {
        let playlist = query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(playlist)
    }

    async fn find_by_external_id(
        &self,
        user_id: &str,
        external_id: &str,
    ) -> Result<Option<Playlist>> {
        let playlist = query_as::<_, Playlist>(
            "SELECT * FROM playlists WHERE user_id = ? AND external_id = ?",
        )
        .bind(user_id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(playlist)
    }

    async fn insert(&self, playlist: &Playlist) -> Result<()> {
        playlist
            .validate()
            .map_err(|msg| CatalogError::InvalidInput {
                field: "playlist".to_string(),
                message: msg,
            })?;

        query(
            r#"
            INSERT INTO playlists (id, user_id, name, external_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&playlist.id)
        .bind(&playlist.user_id)
        .bind(&playlist.name)
        .bind(&playlist.external_id)
        .bind(playlist.created_at)
        .bind(playlist.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, playlist: &Playlist) -> Result<()> {
        playlist
            .validate()
            .map_err(|msg| CatalogError::InvalidInput {
                field: "playlist".to_string(),
                message: msg,
            })?;

        let result = query(
            r#"
            UPDATE playlists SET
                user_id = ?, name = ?, external_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&playlist.user_id)
        .bind(&playlist.name)
        .bind(&playlist.external_id)
        .bind(playlist.updated_at)
        .bind(&playlist.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound {
                entity_type: "Playlist".to_string(),
                id: playlist.id.clone(),
            });
        }

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = query("DELETE FROM playlists WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_track(&self, playlist_id: &str, track_id: &str, position: i32) -> Result<()> {
        query(
            r#"
            INSERT INTO playlist_tracks (playlist_id, track_id, position, added_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(playlist_id)
        .bind(track_id)
        .bind(position)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_track(&self, playlist_id: &str, track_id: &str) -> Result<bool> {
        let result = query("DELETE FROM playlist_tracks WHERE playlist_id = ? AND track_id = ?")
            .bind(playlist_id)
            .bind(track_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn track_ids(&self, playlist_id: &str) -> Result<Vec<String>> {
        let ids: Vec<(String,)> = query_as(
            "SELECT track_id FROM playlist_tracks WHERE playlist_id = ? ORDER BY position ASC",
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn manifest_playlists(&self, user_id: &str) -> Result<Vec<Playlist>> {
        let playlists = query_as::<_, Playlist>(
            "SELECT * FROM playlists WHERE user_id = ? AND external_id IS NOT NULL",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(playlists)
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = query_as("SELECT COUNT(*) FROM playlists")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::{Track, UNKNOWN_ALBUM_ID, UNKNOWN_ARTIST_ID};
    use crate::repositories::{SqliteTrackRepository, TrackRepository};

    fn test_track(id: &str, path: &str) -> Track {
        Track {
            id: id.to_string(),
            path: path.to_string(),
            title: "Test Track".to_string(),
            artist_id: UNKNOWN_ARTIST_ID.to_string(),
            album_artist_id: None,
            album_id: UNKNOWN_ALBUM_ID.to_string(),
            duration_ms: 180_000,
            track_number: None,
            lyrics: None,
            artwork_id: None,
            mtime: 1_699_200_000,
            external_id: None,
            created_at: 1_699_200_000,
            updated_at: 1_699_200_000,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_playlist() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqlitePlaylistRepository::new(pool);

        let playlist = Playlist::new_from_manifest(
            "user-1".to_string(),
            "Road Trip".to_string(),
            "ext-1".to_string(),
        );
        repo.insert(&playlist).await.unwrap();

        let found = repo.find_by_id(&playlist.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Road Trip");

        let by_external = repo
            .find_by_external_id("user-1", "ext-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_external.id, playlist.id);

        // Another user's lookup must not see it
        assert!(repo
            .find_by_external_id("user-2", "ext-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_playlist_name() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqlitePlaylistRepository::new(pool);

        let mut playlist = Playlist::new("user-1".to_string(), "Old Name".to_string());
        repo.insert(&playlist).await.unwrap();

        playlist.name = "New Name".to_string();
        repo.update(&playlist).await.unwrap();

        let found = repo.find_by_id(&playlist.id).await.unwrap().unwrap();
        assert_eq!(found.name, "New Name");
    }

    #[tokio::test]
    async fn test_membership_round_trip() {
        let pool = create_test_pool().await.unwrap();
        let tracks = SqliteTrackRepository::new(pool.clone());
        let repo = SqlitePlaylistRepository::new(pool);

        tracks.insert(&test_track("t-1", "/music/a.mp3")).await.unwrap();
        tracks.insert(&test_track("t-2", "/music/b.mp3")).await.unwrap();

        let playlist = Playlist::new("user-1".to_string(), "Mix".to_string());
        repo.insert(&playlist).await.unwrap();

        repo.add_track(&playlist.id, "t-2", 0).await.unwrap();
        repo.add_track(&playlist.id, "t-1", 1).await.unwrap();

        let ids = repo.track_ids(&playlist.id).await.unwrap();
        assert_eq!(ids, vec!["t-2".to_string(), "t-1".to_string()]);

        assert!(repo.remove_track(&playlist.id, "t-2").await.unwrap());
        assert!(!repo.remove_track(&playlist.id, "t-2").await.unwrap());

        let ids = repo.track_ids(&playlist.id).await.unwrap();
        assert_eq!(ids, vec!["t-1".to_string()]);
    }

    #[tokio::test]
    async fn test_track_deletion_cascades_membership() {
        let pool = create_test_pool().await.unwrap();
        let tracks = SqliteTrackRepository::new(pool.clone());
        let repo = SqlitePlaylistRepository::new(pool);

        tracks.insert(&test_track("t-1", "/music/a.mp3")).await.unwrap();

        let playlist = Playlist::new("user-1".to_string(), "Mix".to_string());
        repo.insert(&playlist).await.unwrap();
        repo.add_track(&playlist.id, "t-1", 0).await.unwrap();

        tracks.delete("t-1").await.unwrap();

        assert!(repo.track_ids(&playlist.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manifest_playlists_excludes_user_playlists() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqlitePlaylistRepository::new(pool);

        repo.insert(&Playlist::new("user-1".to_string(), "Hand Made".to_string()))
            .await
            .unwrap();
        repo.insert(&Playlist::new_from_manifest(
            "user-1".to_string(),
            "Imported".to_string(),
            "ext-7".to_string(),
        ))
        .await
        .unwrap();

        let manifest_owned = repo.manifest_playlists("user-1").await.unwrap();
        assert_eq!(manifest_owned.len(), 1);
        assert_eq!(manifest_owned[0].name, "Imported");
    }

    #[tokio::test]
    async fn test_delete_playlist_removes_membership() {
        let pool = create_test_pool().await.unwrap();
        let tracks = SqliteTrackRepository::new(pool.clone());
        let repo = SqlitePlaylistRepository::new(pool.clone());

        tracks.insert(&test_track("t-1", "/music/a.mp3")).await.unwrap();

        let playlist = Playlist::new("user-1".to_string(), "Mix".to_string());
        repo.insert(&playlist).await.unwrap();
        repo.add_track(&playlist.id, "t-1", 0).await.unwrap();

        assert!(repo.delete(&playlist.id).await.unwrap());

        let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM playlist_tracks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows.0, 0);
    }
}

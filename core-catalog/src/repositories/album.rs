//! Album repository trait and SQLite implementation

use crate::error::{CatalogError, Result};
use crate::models::Album;
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Album repository interface for data access operations
#[async_trait]
pub trait AlbumRepository: Send + Sync {
    /// Find an album by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Album>>;

    /// Insert a new album
    async fn insert(&self, album: &Album) -> Result<()>;

    /// Find an album by normalized name and owning artist, creating it if
    /// absent.
    ///
    /// Albums are keyed by (name, artist) so two artists can each own an
    /// album with the same title. The check-then-create is serialized (a
    /// single upsert statement), so concurrent reconciliations discovering
    /// the same new album cannot produce duplicate rows.
    async fn find_or_create(&self, name: &str, artist_id: Option<&str>) -> Result<Album>;

    /// Distinct artist ids referenced as album owner
    async fn referenced_artist_ids(&self) -> Result<Vec<String>>;

    /// Delete every album whose id is not in `keep`
    ///
    /// # Returns
    /// The number of rows removed.
    async fn delete_except(&self, keep: &[String]) -> Result<u64>;

    /// Count total albums
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of AlbumRepository
pub struct SqliteAlbumRepository {
    pool: SqlitePool,
}

impl SqliteAlbumRepository {
    /// Create a new SQLite album repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlbumRepository for SqliteAlbumRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Album>> {
        let album = query_as::<_, Album>("SELECT * FROM albums WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(album)
    }

    async fn insert(&self, album: &Album) -> Result<()> {
        album.validate().map_err(|msg| CatalogError::InvalidInput {
            field: "album".to_string(),
            message: msg,
        })?;

        sqlx::query(
            r#"
            INSERT INTO albums (id, name, normalized_name, artist_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&album.id)
        .bind(&album.name)
        .bind(&album.normalized_name)
        .bind(&album.artist_id)
        .bind(album.created_at)
        .bind(album.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_or_create(&self, name: &str, artist_id: Option<&str>) -> Result<Album> {
        let candidate = Album::new(name.to_string(), artist_id.map(String::from));
        candidate
            .validate()
            .map_err(|msg| CatalogError::InvalidInput {
                field: "album".to_string(),
                message: msg,
            })?;

        sqlx::query(
            r#"
            INSERT INTO albums (id, name, normalized_name, artist_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&candidate.id)
        .bind(&candidate.name)
        .bind(&candidate.normalized_name)
        .bind(&candidate.artist_id)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&self.pool)
        .await?;

        // `IS ?` is SQLite's null-safe comparison, matching the NULL-artist case
        let album = query_as::<_, Album>(
            "SELECT * FROM albums WHERE normalized_name = ? AND artist_id IS ?",
        )
        .bind(&candidate.normalized_name)
        .bind(&candidate.artist_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(album)
    }

    async fn referenced_artist_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<(String,)> =
            query_as("SELECT DISTINCT artist_id FROM albums WHERE artist_id IS NOT NULL")
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn delete_except(&self, keep: &[String]) -> Result<u64> {
        if keep.is_empty() {
            let result = sqlx::query("DELETE FROM albums").execute(&self.pool).await?;
            return Ok(result.rows_affected());
        }

        let placeholders = vec!["?"; keep.len()].join(",");
        let sql = format!("DELETE FROM albums WHERE id NOT IN ({})", placeholders);

        let mut query = sqlx::query(&sql);
        for id in keep {
            query = query.bind(id);
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = query_as("SELECT COUNT(*) FROM albums")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::repositories::{ArtistRepository, SqliteArtistRepository};

    #[tokio::test]
    async fn test_find_or_create_creates_once() {
        let pool = create_test_pool().await.unwrap();
        let artists = SqliteArtistRepository::new(pool.clone());
        let repo = SqliteAlbumRepository::new(pool);

        let artist = artists.find_or_create("Miles Davis").await.unwrap();

        let first = repo
            .find_or_create("Kind of Blue", Some(&artist.id))
            .await
            .unwrap();
        let second = repo
            .find_or_create("  kind of blue", Some(&artist.id))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.name, "Kind of Blue");
    }

    #[tokio::test]
    async fn test_same_title_distinct_artists() {
        let pool = create_test_pool().await.unwrap();
        let artists = SqliteArtistRepository::new(pool.clone());
        let repo = SqliteAlbumRepository::new(pool);

        let a = artists.find_or_create("Artist A").await.unwrap();
        let b = artists.find_or_create("Artist B").await.unwrap();

        let first = repo.find_or_create("Greatest Hits", Some(&a.id)).await.unwrap();
        let second = repo.find_or_create("Greatest Hits", Some(&b.id)).await.unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_find_or_create_without_artist() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteAlbumRepository::new(pool);

        let first = repo.find_or_create("Loose Tracks", None).await.unwrap();
        let second = repo.find_or_create("Loose Tracks", None).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.artist_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_except_preserves_keep_set() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteAlbumRepository::new(pool);

        let kept = repo.find_or_create("Kept Album", None).await.unwrap();
        repo.find_or_create("Doomed Album", None).await.unwrap();

        let keep = vec![kept.id.clone(), "unknown-album".to_string()];
        let removed = repo.delete_except(&keep).await.unwrap();

        assert_eq!(removed, 1);
        assert!(repo.find_by_id(&kept.id).await.unwrap().is_some());
        assert!(repo.find_by_id("unknown-album").await.unwrap().is_some());
    }
}

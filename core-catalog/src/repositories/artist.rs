//! Artist repository trait and SQLite implementation

use crate::error::{CatalogError, Result};
use crate::models::Artist;
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Artist repository interface for data access operations
#[async_trait]
pub trait ArtistRepository: Send + Sync {
    /// Find an artist by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Artist>>;

    /// Insert a new artist
    async fn insert(&self, artist: &Artist) -> Result<()>;

    /// Find an artist by normalized name, creating it if absent.
    ///
    /// The check-then-create is serialized (a single upsert statement), so
    /// concurrent reconciliations discovering the same new name cannot
    /// produce duplicate rows.
    async fn find_or_create(&self, name: &str) -> Result<Artist>;

    /// Delete every artist whose id is not in `keep`
    ///
    /// # Returns
    /// The number of rows removed.
    async fn delete_except(&self, keep: &[String]) -> Result<u64>;

    /// Count total artists
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of ArtistRepository
pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    /// Create a new SQLite artist repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Artist>> {
        let artist = query_as::<_, Artist>("SELECT * FROM artists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn insert(&self, artist: &Artist) -> Result<()> {
        artist.validate().map_err(|msg| CatalogError::InvalidInput {
            field: "artist".to_string(),
            message: msg,
        })?;

        sqlx::query(
            r#"
            INSERT INTO artists (id, name, normalized_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&artist.id)
        .bind(&artist.name)
        .bind(&artist.normalized_name)
        .bind(artist.created_at)
        .bind(artist.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_or_create(&self, name: &str) -> Result<Artist> {
        let candidate = Artist::new(name.to_string());
        candidate
            .validate()
            .map_err(|msg| CatalogError::InvalidInput {
                field: "artist".to_string(),
                message: msg,
            })?;

        sqlx::query(
            r#"
            INSERT INTO artists (id, name, normalized_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (normalized_name) DO NOTHING
            "#,
        )
        .bind(&candidate.id)
        .bind(&candidate.name)
        .bind(&candidate.normalized_name)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&self.pool)
        .await?;

        let artist = query_as::<_, Artist>("SELECT * FROM artists WHERE normalized_name = ?")
            .bind(&candidate.normalized_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn delete_except(&self, keep: &[String]) -> Result<u64> {
        if keep.is_empty() {
            let result = sqlx::query("DELETE FROM artists").execute(&self.pool).await?;
            return Ok(result.rows_affected());
        }

        let placeholders = vec!["?"; keep.len()].join(",");
        let sql = format!("DELETE FROM artists WHERE id NOT IN ({})", placeholders);

        let mut query = sqlx::query(&sql);
        for id in keep {
            query = query.bind(id);
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = query_as("SELECT COUNT(*) FROM artists")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_find_or_create_creates_once() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteArtistRepository::new(pool);

        let first = repo.find_or_create("The Beatles").await.unwrap();
        let second = repo.find_or_create("the beatles ").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.name, "The Beatles");

        // Sentinels plus the one created row
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_find_or_create_rejects_empty_name() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteArtistRepository::new(pool);

        assert!(repo.find_or_create("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_except_preserves_keep_set() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteArtistRepository::new(pool);

        let kept = repo.find_or_create("Kept Artist").await.unwrap();
        repo.find_or_create("Doomed Artist").await.unwrap();

        let keep = vec![
            kept.id.clone(),
            "unknown-artist".to_string(),
            "various-artists".to_string(),
        ];
        let removed = repo.delete_except(&keep).await.unwrap();

        assert_eq!(removed, 1);
        assert!(repo.find_by_id(&kept.id).await.unwrap().is_some());
        assert!(repo.find_by_id("unknown-artist").await.unwrap().is_some());
    }
}

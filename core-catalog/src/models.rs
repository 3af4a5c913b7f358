//! Domain models for the media catalog
//!
//! This module contains immutable value types with validation and database
//! mapping. Reconciliation algorithms operate on these values plus
//! repository calls; they never reach into the database directly.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// Sentinel Entities
// =============================================================================

/// Fixed id of the sentinel artist used when a track carries no artist tag.
/// Seeded by the initial migration; exempt from garbage collection.
pub const UNKNOWN_ARTIST_ID: &str = "unknown-artist";

/// Fixed id of the sentinel artist for compilations. Seeded by the initial
/// migration; exempt from garbage collection.
pub const VARIOUS_ARTISTS_ID: &str = "various-artists";

/// Fixed id of the sentinel album used when a track carries no album tag.
/// Seeded by the initial migration; exempt from garbage collection.
pub const UNKNOWN_ALBUM_ID: &str = "unknown-album";

/// Artist ids that must never be deleted.
pub fn sentinel_artist_ids() -> [&'static str; 2] {
    [UNKNOWN_ARTIST_ID, VARIOUS_ARTISTS_ID]
}

/// Album ids that must never be deleted.
pub fn sentinel_album_ids() -> [&'static str; 1] {
    [UNKNOWN_ALBUM_ID]
}

fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

// =============================================================================
// Domain Models
// =============================================================================

/// A catalogued media track.
///
/// The id is the SHA-256 digest of the track's normalized source path, so a
/// record is correlated with its filesystem location across runs without
/// reading file content. A path change is indistinguishable from
/// delete + create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Track {
    /// Location-derived identity (SHA-256 of the normalized path)
    pub id: String,
    /// Normalized absolute source path
    pub path: String,
    /// Track title
    pub title: String,
    /// Primary artist reference
    pub artist_id: String,
    /// Album artist reference (for compilations)
    pub album_artist_id: Option<String>,
    /// Album reference
    pub album_id: String,
    /// Duration in milliseconds
    pub duration_ms: i64,
    /// Track position on album
    pub track_number: Option<i32>,
    /// Embedded or sidecar lyrics
    pub lyrics: Option<String>,
    /// Embedded-art reference (hash of the front-cover image)
    pub artwork_id: Option<String>,
    /// Source modification time (unix seconds)
    pub mtime: i64,
    /// External identifier from a manifest import, for playlist correlation
    pub external_id: Option<String>,
    /// When first added
    pub created_at: i64,
    /// Last update time
    pub updated_at: i64,
}

impl Track {
    /// Validate track data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Track id cannot be empty".to_string());
        }

        if self.path.trim().is_empty() {
            return Err("Track path cannot be empty".to_string());
        }

        if self.title.trim().is_empty() {
            return Err("Track title cannot be empty".to_string());
        }

        if self.duration_ms < 0 {
            return Err("Track duration cannot be negative".to_string());
        }

        if let Some(track_number) = self.track_number {
            if track_number <= 0 {
                return Err("Track number must be positive".to_string());
            }
        }

        Ok(())
    }
}

/// Album derived from track tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Album {
    /// Unique identifier
    pub id: String,
    /// Album name
    pub name: String,
    /// Normalized name for lookup
    pub normalized_name: String,
    /// Owning artist (album artist), if known
    pub artist_id: Option<String>,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

impl Album {
    /// Create a new album with normalized name
    pub fn new(name: String, artist_id: Option<String>) -> Self {
        let normalized_name = Self::normalize(&name);
        let now = now_timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            normalized_name,
            artist_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate album data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Album name cannot be empty".to_string());
        }

        Ok(())
    }

    /// Whether this is a migration-seeded sentinel row
    pub fn is_sentinel(&self) -> bool {
        sentinel_album_ids().contains(&self.id.as_str())
    }

    /// Normalize a name for lookup (lowercase, trimmed)
    pub fn normalize(s: &str) -> String {
        s.trim().to_lowercase()
    }
}

/// Artist derived from track tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Artist {
    /// Unique identifier
    pub id: String,
    /// Artist name
    pub name: String,
    /// Normalized name for lookup
    pub normalized_name: String,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

impl Artist {
    /// Create a new artist with normalized name
    pub fn new(name: String) -> Self {
        let normalized_name = Self::normalize(&name);
        let now = now_timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            normalized_name,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate artist data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Artist name cannot be empty".to_string());
        }

        Ok(())
    }

    /// Whether this is a migration-seeded sentinel row
    pub fn is_sentinel(&self) -> bool {
        sentinel_artist_ids().contains(&self.id.as_str())
    }

    /// Normalize a name for lookup (lowercase, trimmed)
    pub fn normalize(s: &str) -> String {
        s.trim().to_lowercase()
    }
}

/// User-owned playlist.
///
/// A playlist originating from a manifest import carries the manifest's
/// external identifier and is keyed by it, never by name: upstream names
/// may repeat or change between exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Playlist {
    /// Unique identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Playlist name
    pub name: String,
    /// External identifier from a manifest import
    pub external_id: Option<String>,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

impl Playlist {
    /// Create a new user playlist
    pub fn new(user_id: String, name: String) -> Self {
        let now = now_timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            name,
            external_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a playlist owned by a manifest export
    pub fn new_from_manifest(user_id: String, name: String, external_id: String) -> Self {
        let mut playlist = Self::new(user_id, name);
        playlist.external_id = Some(external_id);
        playlist
    }

    /// Validate playlist data
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("Playlist owner cannot be empty".to_string());
        }

        if self.name.trim().is_empty() {
            return Err("Playlist name cannot be empty".to_string());
        }

        Ok(())
    }
}

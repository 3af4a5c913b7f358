//! In-memory repository implementations
//!
//! Fakes backing the repository traits with mutex-guarded maps, so
//! reconciliation algorithms can be unit-tested without a datastore. The
//! mutex serializes `find_or_create`, giving the same check-then-create
//! atomicity the SQLite implementations get from single-statement upserts.

use crate::error::{CatalogError, Result};
use crate::models::{Album, Artist, Playlist, Track};
use crate::repositories::{
    AlbumRepository, ArtistRepository, PlaylistRepository, TrackRepository,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

fn invalid(field: &str, message: String) -> CatalogError {
    CatalogError::InvalidInput {
        field: field.to_string(),
        message,
    }
}

/// In-memory implementation of TrackRepository
#[derive(Default)]
pub struct MemoryTrackRepository {
    tracks: Mutex<HashMap<String, Track>>,
}

impl MemoryTrackRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackRepository for MemoryTrackRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Track>> {
        Ok(self.tracks.lock().unwrap().get(id).cloned())
    }

    async fn find_by_path(&self, path: &str) -> Result<Option<Track>> {
        Ok(self
            .tracks
            .lock()
            .unwrap()
            .values()
            .find(|t| t.path == path)
            .cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Track>> {
        Ok(self
            .tracks
            .lock()
            .unwrap()
            .values()
            .find(|t| t.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn insert(&self, track: &Track) -> Result<()> {
        track.validate().map_err(|msg| invalid("track", msg))?;

        let mut tracks = self.tracks.lock().unwrap();
        if tracks.contains_key(&track.id) {
            return Err(invalid("track", format!("duplicate id {}", track.id)));
        }
        tracks.insert(track.id.clone(), track.clone());
        Ok(())
    }

    async fn update(&self, track: &Track) -> Result<()> {
        track.validate().map_err(|msg| invalid("track", msg))?;

        let mut tracks = self.tracks.lock().unwrap();
        if !tracks.contains_key(&track.id) {
            return Err(CatalogError::NotFound {
                entity_type: "Track".to_string(),
                id: track.id.clone(),
            });
        }
        tracks.insert(track.id.clone(), track.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.tracks.lock().unwrap().remove(id).is_some())
    }

    async fn delete_by_path_prefix(&self, prefix: &str) -> Result<u64> {
        let mut tracks = self.tracks.lock().unwrap();
        let doomed: Vec<String> = tracks
            .values()
            .filter(|t| t.path.starts_with(prefix))
            .map(|t| t.id.clone())
            .collect();
        for id in &doomed {
            tracks.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    async fn all_ids(&self) -> Result<Vec<String>> {
        Ok(self.tracks.lock().unwrap().keys().cloned().collect())
    }

    async fn referenced_album_ids(&self) -> Result<Vec<String>> {
        let tracks = self.tracks.lock().unwrap();
        let mut ids: Vec<String> = tracks.values().map(|t| t.album_id.clone()).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn referenced_artist_ids(&self) -> Result<Vec<String>> {
        let tracks = self.tracks.lock().unwrap();
        let mut ids: Vec<String> = tracks
            .values()
            .flat_map(|t| {
                std::iter::once(t.artist_id.clone()).chain(t.album_artist_id.clone())
            })
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.tracks.lock().unwrap().len() as i64)
    }
}

/// In-memory implementation of ArtistRepository
pub struct MemoryArtistRepository {
    artists: Mutex<HashMap<String, Artist>>,
}

impl MemoryArtistRepository {
    /// Create a repository pre-seeded with the sentinel rows, matching the
    /// state of a freshly migrated database.
    pub fn new() -> Self {
        let mut artists = HashMap::new();
        for (id, name) in [
            ("unknown-artist", "Unknown Artist"),
            ("various-artists", "Various Artists"),
        ] {
            let mut artist = Artist::new(name.to_string());
            artist.id = id.to_string();
            artists.insert(artist.id.clone(), artist);
        }
        Self {
            artists: Mutex::new(artists),
        }
    }
}

impl Default for MemoryArtistRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtistRepository for MemoryArtistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Artist>> {
        Ok(self.artists.lock().unwrap().get(id).cloned())
    }

    async fn insert(&self, artist: &Artist) -> Result<()> {
        artist.validate().map_err(|msg| invalid("artist", msg))?;
        self.artists
            .lock()
            .unwrap()
            .insert(artist.id.clone(), artist.clone());
        Ok(())
    }

    async fn find_or_create(&self, name: &str) -> Result<Artist> {
        let candidate = Artist::new(name.to_string());
        candidate.validate().map_err(|msg| invalid("artist", msg))?;

        let mut artists = self.artists.lock().unwrap();
        if let Some(existing) = artists
            .values()
            .find(|a| a.normalized_name == candidate.normalized_name)
        {
            return Ok(existing.clone());
        }
        artists.insert(candidate.id.clone(), candidate.clone());
        Ok(candidate)
    }

    async fn delete_except(&self, keep: &[String]) -> Result<u64> {
        let mut artists = self.artists.lock().unwrap();
        let doomed: Vec<String> = artists
            .keys()
            .filter(|id| !keep.contains(id))
            .cloned()
            .collect();
        for id in &doomed {
            artists.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.artists.lock().unwrap().len() as i64)
    }
}

/// In-memory implementation of AlbumRepository
pub struct MemoryAlbumRepository {
    albums: Mutex<HashMap<String, Album>>,
}

impl MemoryAlbumRepository {
    /// Create a repository pre-seeded with the sentinel row, matching the
    /// state of a freshly migrated database.
    pub fn new() -> Self {
        let mut albums = HashMap::new();
        let mut album = Album::new("Unknown Album".to_string(), None);
        album.id = "unknown-album".to_string();
        albums.insert(album.id.clone(), album);
        Self {
            albums: Mutex::new(albums),
        }
    }
}

impl Default for MemoryAlbumRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlbumRepository for MemoryAlbumRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Album>> {
        Ok(self.albums.lock().unwrap().get(id).cloned())
    }

    async fn insert(&self, album: &Album) -> Result<()> {
        album.validate().map_err(|msg| invalid("album", msg))?;
        self.albums
            .lock()
            .unwrap()
            .insert(album.id.clone(), album.clone());
        Ok(())
    }

    async fn find_or_create(&self, name: &str, artist_id: Option<&str>) -> Result<Album> {
        let candidate = Album::new(name.to_string(), artist_id.map(String::from));
        candidate.validate().map_err(|msg| invalid("album", msg))?;

        let mut albums = self.albums.lock().unwrap();
        if let Some(existing) = albums.values().find(|a| {
            a.normalized_name == candidate.normalized_name && a.artist_id == candidate.artist_id
        }) {
            return Ok(existing.clone());
        }
        albums.insert(candidate.id.clone(), candidate.clone());
        Ok(candidate)
    }

    async fn referenced_artist_ids(&self) -> Result<Vec<String>> {
        let albums = self.albums.lock().unwrap();
        let mut ids: Vec<String> = albums.values().filter_map(|a| a.artist_id.clone()).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn delete_except(&self, keep: &[String]) -> Result<u64> {
        let mut albums = self.albums.lock().unwrap();
        let doomed: Vec<String> = albums
            .keys()
            .filter(|id| !keep.contains(id))
            .cloned()
            .collect();
        for id in &doomed {
            albums.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.albums.lock().unwrap().len() as i64)
    }
}

/// In-memory implementation of PlaylistRepository
#[derive(Default)]
pub struct MemoryPlaylistRepository {
    playlists: Mutex<HashMap<String, Playlist>>,
    // playlist id -> ordered (track id, position)
    memberships: Mutex<HashMap<String, Vec<(String, i32)>>>,
}

impl MemoryPlaylistRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlaylistRepository for MemoryPlaylistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Playlist>> {
        Ok(self.playlists.lock().unwrap().get(id).cloned())
    }

    async fn find_by_external_id(
        &self,
        user_id: &str,
        external_id: &str,
    ) -> Result<Option<Playlist>> {
        Ok(self
            .playlists
            .lock()
            .unwrap()
            .values()
            .find(|p| p.user_id == user_id && p.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn insert(&self, playlist: &Playlist) -> Result<()> {
        playlist.validate().map_err(|msg| invalid("playlist", msg))?;
        self.playlists
            .lock()
            .unwrap()
            .insert(playlist.id.clone(), playlist.clone());
        Ok(())
    }

    async fn update(&self, playlist: &Playlist) -> Result<()> {
        playlist.validate().map_err(|msg| invalid("playlist", msg))?;

        let mut playlists = self.playlists.lock().unwrap();
        if !playlists.contains_key(&playlist.id) {
            return Err(CatalogError::NotFound {
                entity_type: "Playlist".to_string(),
                id: playlist.id.clone(),
            });
        }
        playlists.insert(playlist.id.clone(), playlist.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.memberships.lock().unwrap().remove(id);
        Ok(self.playlists.lock().unwrap().remove(id).is_some())
    }

    async fn add_track(&self, playlist_id: &str, track_id: &str, position: i32) -> Result<()> {
        self.memberships
            .lock()
            .unwrap()
            .entry(playlist_id.to_string())
            .or_default()
            .push((track_id.to_string(), position));
        Ok(())
    }

    async fn remove_track(&self, playlist_id: &str, track_id: &str) -> Result<bool> {
        let mut memberships = self.memberships.lock().unwrap();
        let Some(rows) = memberships.get_mut(playlist_id) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|(id, _)| id != track_id);
        Ok(rows.len() < before)
    }

    async fn track_ids(&self, playlist_id: &str) -> Result<Vec<String>> {
        let memberships = self.memberships.lock().unwrap();
        let mut rows = memberships.get(playlist_id).cloned().unwrap_or_default();
        rows.sort_by_key(|(_, position)| *position);
        Ok(rows.into_iter().map(|(id, _)| id).collect())
    }

    async fn manifest_playlists(&self, user_id: &str) -> Result<Vec<Playlist>> {
        Ok(self
            .playlists
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.user_id == user_id && p.external_id.is_some())
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.playlists.lock().unwrap().len() as i64)
    }
}

//! Tidy: derived-entity garbage collection
//!
//! Removes albums and artists no longer referenced by any surviving track.
//! The migration-seeded sentinel rows are always kept. Runs after any
//! operation that can reduce the track count.

use crate::error::Result;
use core_catalog::models::{sentinel_album_ids, sentinel_artist_ids};
use core_catalog::repositories::{AlbumRepository, ArtistRepository, TrackRepository};
use std::sync::Arc;
use tracing::{debug, info};

/// Counts of rows removed by one tidy pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TidyReport {
    pub albums_removed: u64,
    pub artists_removed: u64,
}

/// Delete every non-sentinel album and artist with no remaining reference.
///
/// Albums are swept first; the artist keep-set then includes artists still
/// referenced as owner by a surviving album, so the sweep never breaks an
/// album's artist reference.
pub async fn tidy(
    tracks: &Arc<dyn TrackRepository>,
    albums: &Arc<dyn AlbumRepository>,
    artists: &Arc<dyn ArtistRepository>,
) -> Result<TidyReport> {
    let mut keep_albums = tracks.referenced_album_ids().await?;
    keep_albums.extend(sentinel_album_ids().iter().map(|id| id.to_string()));
    let albums_removed = albums.delete_except(&keep_albums).await?;

    let mut keep_artists = tracks.referenced_artist_ids().await?;
    keep_artists.extend(albums.referenced_artist_ids().await?);
    keep_artists.extend(sentinel_artist_ids().iter().map(|id| id.to_string()));
    let artists_removed = artists.delete_except(&keep_artists).await?;

    if albums_removed > 0 || artists_removed > 0 {
        info!(albums_removed, artists_removed, "Tidied unreferenced entities");
    } else {
        debug!("Tidy found nothing to remove");
    }

    Ok(TidyReport {
        albums_removed,
        artists_removed,
    })
}

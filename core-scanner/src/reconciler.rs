//! Item reconciler
//!
//! Decides insert/update/skip/error for a single discovered item and
//! applies it. All persistence goes through the repository traits, so the
//! algorithm is testable against in-memory fakes.

use crate::error::Result;
use crate::identity::{normalize_path, track_identity};
use core_catalog::models::{Track, UNKNOWN_ALBUM_ID, UNKNOWN_ARTIST_ID};
use core_catalog::repositories::{AlbumRepository, ArtistRepository, TrackRepository};
use core_tags::{TagBundle, TagField, TagReader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-item classification for one reconciliation run.
///
/// Used within a single run to compute the survivor set; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// A new track record was inserted
    Created,
    /// An existing record was rewritten
    Updated,
    /// The record already matched the source
    Unchanged,
    /// Extraction or persistence failed; nothing was mutated
    Failed,
}

impl SyncOutcome {
    /// Whether this outcome mutated the catalog.
    pub fn is_mutation(self) -> bool {
        matches!(self, SyncOutcome::Created | SyncOutcome::Updated)
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Created => write!(f, "created"),
            SyncOutcome::Updated => write!(f, "updated"),
            SyncOutcome::Unchanged => write!(f, "unchanged"),
            SyncOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Reconciles one path against the catalog.
#[derive(Clone)]
pub struct ItemReconciler {
    tracks: Arc<dyn TrackRepository>,
    albums: Arc<dyn AlbumRepository>,
    artists: Arc<dyn ArtistRepository>,
    tag_reader: Arc<dyn TagReader>,
    requested_tags: Vec<TagField>,
    force: bool,
}

impl ItemReconciler {
    /// Create a new item reconciler.
    ///
    /// `requested_tags` restricts which fields are compared and overwritten
    /// on existing records (empty means all); new records are always fully
    /// populated. With `force`, an existing record is rewritten even when
    /// no requested field differs.
    pub fn new(
        tracks: Arc<dyn TrackRepository>,
        albums: Arc<dyn AlbumRepository>,
        artists: Arc<dyn ArtistRepository>,
        tag_reader: Arc<dyn TagReader>,
        requested_tags: Vec<TagField>,
        force: bool,
    ) -> Self {
        Self {
            tracks,
            albums,
            artists,
            tag_reader,
            requested_tags,
            force,
        }
    }

    /// Reconcile one path, classifying the result.
    ///
    /// Failures are contained: extraction and persistence errors are logged
    /// per item and reported as `Failed` without mutating the catalog or
    /// aborting the surrounding run. When `external_id` is supplied
    /// (manifest mode), it is persisted on the record for later playlist
    /// correlation.
    pub async fn reconcile(&self, path: &Path, external_id: Option<&str>) -> SyncOutcome {
        match self.try_reconcile(path, external_id).await {
            Ok(outcome) => {
                debug!(path = %path.display(), outcome = %outcome, "Reconciled item");
                outcome
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to persist item");
                SyncOutcome::Failed
            }
        }
    }

    async fn try_reconcile(&self, path: &Path, external_id: Option<&str>) -> Result<SyncOutcome> {
        let id = track_identity(path);

        let tags = match self.tag_reader.extract(path).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Tag extraction failed");
                return Ok(SyncOutcome::Failed);
            }
        };

        match self.tracks.find_by_id(&id).await? {
            None => {
                self.create_track(&id, path, &tags, external_id).await?;
                Ok(SyncOutcome::Created)
            }
            Some(existing) => self.update_track(existing, path, &tags, external_id).await,
        }
    }

    /// Insert a new record with every recognized tag field populated.
    ///
    /// The requested-tag restriction applies only to existing records.
    async fn create_track(
        &self,
        id: &str,
        path: &Path,
        tags: &TagBundle,
        external_id: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let track = Track {
            id: id.to_string(),
            path: normalize_path(path).to_string_lossy().into_owned(),
            title: tags
                .title
                .clone()
                .unwrap_or_else(|| Self::fallback_title(path)),
            artist_id: self.resolve_artist(tags).await?,
            album_artist_id: self.resolve_album_artist(tags).await?,
            album_id: self.resolve_album(tags).await?,
            duration_ms: tags.duration_ms,
            track_number: tags.track_number,
            lyrics: tags.lyrics.clone(),
            artwork_id: tags.artwork_id.clone(),
            mtime: tags.mtime,
            external_id: external_id.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        self.tracks.insert(&track).await?;
        Ok(())
    }

    /// Overwrite only the requested fields, plus the modification time,
    /// which is implicitly always tracked.
    async fn update_track(
        &self,
        existing: Track,
        path: &Path,
        tags: &TagBundle,
        external_id: Option<&str>,
    ) -> Result<SyncOutcome> {
        let fields: &[TagField] = if self.requested_tags.is_empty() {
            &TagField::ALL
        } else {
            &self.requested_tags
        };

        let mut updated = existing.clone();
        for field in fields {
            match field {
                TagField::Title => {
                    updated.title = tags
                        .title
                        .clone()
                        .unwrap_or_else(|| Self::fallback_title(path));
                }
                TagField::Artist => updated.artist_id = self.resolve_artist(tags).await?,
                TagField::AlbumArtist => {
                    updated.album_artist_id = self.resolve_album_artist(tags).await?;
                }
                TagField::Album => updated.album_id = self.resolve_album(tags).await?,
                TagField::Duration => updated.duration_ms = tags.duration_ms,
                TagField::TrackNumber => updated.track_number = tags.track_number,
                TagField::Lyrics => updated.lyrics = tags.lyrics.clone(),
                TagField::Artwork => updated.artwork_id = tags.artwork_id.clone(),
            }
        }

        updated.mtime = tags.mtime;
        if let Some(external_id) = external_id {
            updated.external_id = Some(external_id.to_string());
        }

        if updated == existing && !self.force {
            return Ok(SyncOutcome::Unchanged);
        }

        updated.updated_at = chrono::Utc::now().timestamp();
        self.tracks.update(&updated).await?;
        Ok(SyncOutcome::Updated)
    }

    fn fallback_title(path: &Path) -> String {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    async fn resolve_artist(&self, tags: &TagBundle) -> Result<String> {
        match &tags.artist {
            Some(name) => Ok(self.artists.find_or_create(name).await?.id),
            None => Ok(UNKNOWN_ARTIST_ID.to_string()),
        }
    }

    async fn resolve_album_artist(&self, tags: &TagBundle) -> Result<Option<String>> {
        match &tags.album_artist {
            Some(name) => Ok(Some(self.artists.find_or_create(name).await?.id)),
            None => Ok(None),
        }
    }

    async fn resolve_album(&self, tags: &TagBundle) -> Result<String> {
        let Some(name) = &tags.album else {
            return Ok(UNKNOWN_ALBUM_ID.to_string());
        };

        // The album owner is the album artist when tagged, else the track
        // artist; an album with neither joins the NULL-owner bucket.
        let owner = match (&tags.album_artist, &tags.artist) {
            (Some(album_artist), _) => Some(self.artists.find_or_create(album_artist).await?.id),
            (None, Some(artist)) => Some(self.artists.find_or_create(artist).await?.id),
            (None, None) => None,
        };

        Ok(self.albums.find_or_create(name, owner.as_deref()).await?.id)
    }
}

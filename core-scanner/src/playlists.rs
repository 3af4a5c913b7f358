//! Playlist reconciler
//!
//! Diffs a manifest's playlist collection against stored playlists and
//! track memberships. The manifest is authoritative for the playlists it
//! owns: stored manifest-origin playlists absent from the current document
//! are deleted. Playlists the user created by hand (no external id) are
//! never touched.

use crate::error::Result;
use crate::manifest::ManifestPlaylist;
use crate::progress::ProgressSink;
use crate::reconciler::SyncOutcome;
use core_catalog::models::Playlist;
use core_catalog::repositories::{PlaylistRepository, TrackRepository};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Aggregate result of one playlist reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaylistSyncReport {
    /// Manifest entries seen, including skipped ones
    pub processed: u64,
    /// Stored playlists deleted because the manifest no longer lists them
    pub removed: u64,
}

/// Reconciles manifest playlists for one user.
pub struct PlaylistReconciler {
    playlists: Arc<dyn PlaylistRepository>,
    tracks: Arc<dyn TrackRepository>,
}

impl PlaylistReconciler {
    pub fn new(playlists: Arc<dyn PlaylistRepository>, tracks: Arc<dyn TrackRepository>) -> Self {
        Self { playlists, tracks }
    }

    /// Reconcile every manifest playlist for `user_id`, then delete stored
    /// manifest-origin playlists whose external id was absent this run.
    ///
    /// Entries marked not-visible or lacking an item list are skipped but
    /// still counted as processed, and their external ids still protect the
    /// stored playlist from the deletion pass: the entry is present in the
    /// manifest, just not eligible for sync.
    pub async fn reconcile(
        &self,
        manifest_playlists: &[ManifestPlaylist],
        user_id: &str,
        progress: &Arc<dyn ProgressSink>,
    ) -> Result<PlaylistSyncReport> {
        let mut report = PlaylistSyncReport::default();
        let mut seen: HashSet<&str> = HashSet::new();

        for entry in manifest_playlists {
            report.processed += 1;
            seen.insert(entry.external_id.as_str());

            let Some(items) = entry.items.as_ref().filter(|_| entry.visible) else {
                debug!(
                    playlist = %entry.name,
                    "Skipping manifest playlist (hidden or without items)"
                );
                progress.playlist_completed(&entry.name, SyncOutcome::Unchanged);
                continue;
            };

            let outcome = self.reconcile_one(entry, items, user_id).await?;
            progress.playlist_completed(&entry.name, outcome);
        }

        report.removed = self.delete_unlisted(user_id, &seen).await?;

        Ok(report)
    }

    async fn reconcile_one(
        &self,
        entry: &ManifestPlaylist,
        items: &[String],
        user_id: &str,
    ) -> Result<SyncOutcome> {
        let existing = self
            .playlists
            .find_by_external_id(user_id, &entry.external_id)
            .await?;

        let mut created = false;
        let mut renamed = false;

        let playlist = match existing {
            Some(mut playlist) => {
                // Keyed by external id; the name follows the manifest
                if playlist.name != entry.name {
                    playlist.name = entry.name.clone();
                    playlist.updated_at = chrono::Utc::now().timestamp();
                    self.playlists.update(&playlist).await?;
                    renamed = true;
                }
                playlist
            }
            None => {
                let playlist = Playlist::new_from_manifest(
                    user_id.to_string(),
                    entry.name.clone(),
                    entry.external_id.clone(),
                );
                self.playlists.insert(&playlist).await?;
                created = true;
                playlist
            }
        };

        // Desired membership: manifest items mapped to stored tracks,
        // dropping references that don't resolve and duplicates.
        let mut desired: Vec<String> = Vec::new();
        let mut desired_set: HashSet<String> = HashSet::new();
        for external_track_id in items {
            match self.tracks.find_by_external_id(external_track_id).await? {
                Some(track) => {
                    if desired_set.insert(track.id.clone()) {
                        desired.push(track.id);
                    }
                }
                None => {
                    debug!(
                        playlist = %entry.name,
                        external_track_id,
                        "Dropping unresolvable playlist item"
                    );
                }
            }
        }

        let current = self.playlists.track_ids(&playlist.id).await?;
        let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();

        let attach: Vec<(usize, &str)> = desired
            .iter()
            .enumerate()
            .filter(|(_, id)| !current_set.contains(id.as_str()))
            .map(|(position, id)| (position, id.as_str()))
            .collect();
        let detach: Vec<&str> = current
            .iter()
            .filter(|id| !desired_set.contains(*id))
            .map(String::as_str)
            .collect();

        for (position, track_id) in &attach {
            self.playlists
                .add_track(&playlist.id, track_id, *position as i32)
                .await?;
        }
        for track_id in &detach {
            self.playlists.remove_track(&playlist.id, track_id).await?;
        }

        let outcome = if created {
            SyncOutcome::Created
        } else if renamed || !attach.is_empty() || !detach.is_empty() {
            SyncOutcome::Updated
        } else {
            SyncOutcome::Unchanged
        };

        debug!(
            playlist = %entry.name,
            attached = attach.len(),
            detached = detach.len(),
            outcome = %outcome,
            "Reconciled manifest playlist"
        );

        Ok(outcome)
    }

    async fn delete_unlisted(&self, user_id: &str, seen: &HashSet<&str>) -> Result<u64> {
        let mut removed = 0;

        for stored in self.playlists.manifest_playlists(user_id).await? {
            let Some(external_id) = stored.external_id.as_deref() else {
                continue;
            };
            if !seen.contains(external_id) {
                info!(
                    playlist = %stored.name,
                    external_id,
                    "Deleting playlist no longer present in manifest"
                );
                self.playlists.delete(&stored.id).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

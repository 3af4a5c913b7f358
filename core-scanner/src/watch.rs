//! Watch-event handler
//!
//! Applies reconciliation incrementally, scoped to one path, in response to
//! filesystem change notifications. The handler never runs the orphan
//! sweep: files removed from a directory are reported by their own Deleted
//! events upstream, not inferred here.
//!
//! Callers should deliver events in the order received per path. The
//! handler also tolerates out-of-order delivery: Deleted is idempotent and
//! Created/Modified are upserts, so a stale event cannot corrupt the
//! catalog; at worst it leaves state one event behind.

use crate::discovery;
use crate::error::{Result, ScanError};
use crate::identity::{normalize_path, track_identity};
use crate::orchestrator::Scanner;
use crate::tidy::tidy;
use core_runtime::events::ChangeOrigin;
use serde::{Deserialize, Serialize};
use std::path::{PathBuf, MAIN_SEPARATOR};
use tracing::{debug, info};

/// What kind of filesystem object a notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathKind {
    File,
    Directory,
}

/// What happened to the watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
    Created,
    Modified,
    Deleted,
}

/// One filesystem change notification.
///
/// Ephemeral: consumed once, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRecord {
    pub path: PathBuf,
    pub kind: PathKind,
    pub event: ChangeEvent,
}

impl WatchRecord {
    pub fn new(path: impl Into<PathBuf>, kind: PathKind, event: ChangeEvent) -> Self {
        Self {
            path: path.into(),
            kind,
            event,
        }
    }
}

impl Scanner {
    /// Handle one filesystem change notification.
    ///
    /// Catalog-changed is emitted only when a row was actually created,
    /// updated, or deleted; Unchanged and Failed outcomes and no-op
    /// deletions stay silent so incremental mode doesn't produce
    /// notification storms.
    pub async fn handle_watch(&self, record: WatchRecord) -> Result<()> {
        debug!(
            path = %record.path.display(),
            kind = ?record.kind,
            event = ?record.event,
            "Handling watch record"
        );

        match (record.kind, record.event) {
            (PathKind::File, ChangeEvent::Deleted) => {
                let id = track_identity(&record.path);
                if self.tracks.delete(&id).await? {
                    info!(path = %record.path.display(), "Deleted track for removed file");
                    tidy(&self.tracks, &self.albums, &self.artists).await?;
                    self.emit_catalog_changed(ChangeOrigin::Watch);
                } else {
                    debug!(path = %record.path.display(), "No track for deleted file; no-op");
                }
            }

            (PathKind::File, ChangeEvent::Created | ChangeEvent::Modified) => {
                let outcome = self.reconciler.reconcile(&record.path, None).await;
                info!(path = %record.path.display(), outcome = %outcome, "Watched file reconciled");
                self.progress.item_completed(&record.path, outcome);
                if outcome.is_mutation() {
                    self.emit_catalog_changed(ChangeOrigin::Watch);
                }
            }

            (PathKind::Directory, ChangeEvent::Deleted) => {
                let mut prefix = normalize_path(&record.path)
                    .to_string_lossy()
                    .into_owned();
                if !prefix.ends_with(MAIN_SEPARATOR) {
                    prefix.push(MAIN_SEPARATOR);
                }

                let removed = self.tracks.delete_by_path_prefix(&prefix).await?;
                if removed > 0 {
                    info!(
                        path = %record.path.display(),
                        removed,
                        "Deleted tracks under removed directory"
                    );
                    tidy(&self.tracks, &self.albums, &self.artists).await?;
                    self.emit_catalog_changed(ChangeOrigin::Watch);
                }
            }

            (PathKind::Directory, ChangeEvent::Created | ChangeEvent::Modified) => {
                let root = record.path.clone();
                let extensions = self.options.audio_extensions.clone();
                let candidates = tokio::task::spawn_blocking(move || {
                    discovery::discover(&root, &extensions).collect::<Vec<_>>()
                })
                .await
                .map_err(|e| ScanError::Internal(format!("Discovery task failed: {}", e)))?;

                let mut mutated = false;
                for path in candidates {
                    let outcome = self.reconciler.reconcile(&path, None).await;
                    self.progress.item_completed(&path, outcome);
                    mutated |= outcome.is_mutation();
                }
                if mutated {
                    self.emit_catalog_changed(ChangeOrigin::Watch);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ScanOptions;
    use async_trait::async_trait;
    use core_catalog::repositories::{
        MemoryAlbumRepository, MemoryArtistRepository, MemoryPlaylistRepository,
        MemoryTrackRepository, TrackRepository,
    };
    use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
    use core_tags::{TagBundle, TagReader};
    use std::path::Path;
    use std::sync::Arc;

    struct StubTagReader;

    #[async_trait]
    impl TagReader for StubTagReader {
        async fn extract(&self, path: &Path) -> core_tags::Result<TagBundle> {
            Ok(TagBundle {
                title: path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string),
                artist: Some("Watched Artist".to_string()),
                album: Some("Watched Album".to_string()),
                duration_ms: 1000,
                mtime: 42,
                ..TagBundle::default()
            })
        }
    }

    struct Fixture {
        scanner: Scanner,
        tracks: Arc<MemoryTrackRepository>,
        bus: Arc<EventBus>,
    }

    fn fixture() -> Fixture {
        let tracks = Arc::new(MemoryTrackRepository::new());
        let bus = Arc::new(EventBus::new(100));
        let scanner = Scanner::new(
            ScanOptions::new("/music"),
            tracks.clone(),
            Arc::new(MemoryAlbumRepository::new()),
            Arc::new(MemoryArtistRepository::new()),
            Arc::new(MemoryPlaylistRepository::new()),
            Arc::new(StubTagReader),
            bus.clone(),
        );
        Fixture {
            scanner,
            tracks,
            bus,
        }
    }

    fn drain_changed(stream: &mut core_runtime::events::Receiver<CoreEvent>) -> usize {
        let mut changed = 0;
        while let Ok(event) = stream.try_recv() {
            if matches!(event, CoreEvent::Catalog(CatalogEvent::Changed { .. })) {
                changed += 1;
            }
        }
        changed
    }

    #[tokio::test]
    async fn test_file_created_inserts_exactly_one_track() {
        let fx = fixture();
        let mut stream = fx.bus.subscribe();

        fx.scanner
            .handle_watch(WatchRecord::new(
                "/music/new.mp3",
                PathKind::File,
                ChangeEvent::Created,
            ))
            .await
            .unwrap();

        assert_eq!(fx.tracks.count().await.unwrap(), 1);
        assert_eq!(drain_changed(&mut stream), 1);
    }

    #[tokio::test]
    async fn test_file_modified_unchanged_stays_silent() {
        let fx = fixture();

        fx.scanner
            .handle_watch(WatchRecord::new(
                "/music/a.mp3",
                PathKind::File,
                ChangeEvent::Created,
            ))
            .await
            .unwrap();

        let mut stream = fx.bus.subscribe();
        fx.scanner
            .handle_watch(WatchRecord::new(
                "/music/a.mp3",
                PathKind::File,
                ChangeEvent::Modified,
            ))
            .await
            .unwrap();

        assert_eq!(fx.tracks.count().await.unwrap(), 1);
        assert_eq!(drain_changed(&mut stream), 0);
    }

    #[tokio::test]
    async fn test_file_deleted_without_track_is_noop() {
        let fx = fixture();
        let mut stream = fx.bus.subscribe();

        fx.scanner
            .handle_watch(WatchRecord::new(
                "/music/never-seen.mp3",
                PathKind::File,
                ChangeEvent::Deleted,
            ))
            .await
            .unwrap();

        assert_eq!(drain_changed(&mut stream), 0);
    }

    #[tokio::test]
    async fn test_file_deleted_removes_track_and_notifies() {
        let fx = fixture();

        fx.scanner
            .handle_watch(WatchRecord::new(
                "/music/a.mp3",
                PathKind::File,
                ChangeEvent::Created,
            ))
            .await
            .unwrap();

        let mut stream = fx.bus.subscribe();
        fx.scanner
            .handle_watch(WatchRecord::new(
                "/music/a.mp3",
                PathKind::File,
                ChangeEvent::Deleted,
            ))
            .await
            .unwrap();

        assert_eq!(fx.tracks.count().await.unwrap(), 0);
        assert_eq!(drain_changed(&mut stream), 1);

        // Deleted is idempotent
        fx.scanner
            .handle_watch(WatchRecord::new(
                "/music/a.mp3",
                PathKind::File,
                ChangeEvent::Deleted,
            ))
            .await
            .unwrap();
        assert_eq!(drain_changed(&mut stream), 0);
    }

    #[tokio::test]
    async fn test_directory_deleted_removes_prefix_with_one_notification() {
        let fx = fixture();

        for path in ["/music/rock/a.mp3", "/music/rock/b.mp3", "/music/jazz/c.mp3"] {
            fx.scanner
                .handle_watch(WatchRecord::new(path, PathKind::File, ChangeEvent::Created))
                .await
                .unwrap();
        }

        let mut stream = fx.bus.subscribe();
        fx.scanner
            .handle_watch(WatchRecord::new(
                "/music/rock",
                PathKind::Directory,
                ChangeEvent::Deleted,
            ))
            .await
            .unwrap();

        assert_eq!(fx.tracks.count().await.unwrap(), 1);
        assert_eq!(drain_changed(&mut stream), 1);
    }

    #[tokio::test]
    async fn test_directory_deleted_prefix_does_not_catch_siblings() {
        let fx = fixture();

        fx.scanner
            .handle_watch(WatchRecord::new(
                "/music/rocket.mp3",
                PathKind::File,
                ChangeEvent::Created,
            ))
            .await
            .unwrap();

        fx.scanner
            .handle_watch(WatchRecord::new(
                "/music/rock",
                PathKind::Directory,
                ChangeEvent::Deleted,
            ))
            .await
            .unwrap();

        // "/music/rocket.mp3" is not under "/music/rock/"
        assert_eq!(fx.tracks.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_directory_created_reconciles_scoped_discovery() {
        let fx = fixture();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("b.flac"), b"x").unwrap();
        std::fs::write(dir.path().join("ignore.txt"), b"x").unwrap();

        let mut stream = fx.bus.subscribe();
        fx.scanner
            .handle_watch(WatchRecord::new(
                dir.path(),
                PathKind::Directory,
                ChangeEvent::Created,
            ))
            .await
            .unwrap();

        assert_eq!(fx.tracks.count().await.unwrap(), 2);
        assert_eq!(drain_changed(&mut stream), 1);
    }
}

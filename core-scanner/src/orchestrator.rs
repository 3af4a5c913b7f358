//! # Full-Sync Orchestrator
//!
//! Drives Discovery (or a parsed manifest) through the Item Reconciler over
//! an entire source, computes the survivor set, and deletes orphans.
//!
//! ## Workflow
//!
//! ### Full sync
//! 1. Discover candidate files under the media root
//! 2. Reconcile every item on a bounded worker pool
//! 3. After the pool drains (the sweep barrier), delete every persisted
//!    track absent from this run's retention set
//! 4. Tidy unreferenced albums/artists
//! 5. Emit one catalog-changed notification
//!
//! ### Manifest import
//! Same shape, with candidates taken from the manifest's track list
//! (locations normalized first) and a playlist reconciliation pass between
//! the orphan sweep and tidy.
//!
//! ## Consistency
//!
//! The orphan sweep must observe the complete result set of all item
//! reconciliations from the same run; running it earlier would delete
//! tracks not yet revisited. Cancellation is checked at item granularity:
//! a cancelled run leaves the catalog valid but incomplete, and no sweep or
//! tidy executes. Items that fail extraction stay in the retention set, so
//! a transient failure never deletes a previously good record; deletion
//! requires the path to disappear from the source.

use crate::error::{Result, ScanError};
use crate::identity::track_identity;
use crate::manifest::{normalize_location, Manifest, ManifestStatus};
use crate::options::ScanOptions;
use crate::playlists::PlaylistReconciler;
use crate::progress::{NoopProgressSink, ProgressSink};
use crate::reconciler::{ItemReconciler, SyncOutcome};
use crate::tidy::tidy;
use crate::discovery;
use core_catalog::repositories::{
    AlbumRepository, ArtistRepository, PlaylistRepository, TrackRepository,
};
use core_runtime::events::{CatalogEvent, ChangeOrigin, CoreEvent, EventBus, ScanEvent};
use core_tags::TagReader;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Aggregate counts for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// New tracks inserted
    pub created: u64,
    /// Existing tracks rewritten
    pub updated: u64,
    /// Tracks already matching the source
    pub unchanged: u64,
    /// Items that failed extraction or persistence
    pub failed: u64,
    /// Tracks deleted by the orphan sweep
    pub orphans_removed: u64,
    /// Manifest playlists processed (manifest mode)
    pub playlists_processed: u64,
    /// Stored playlists deleted because the manifest dropped them
    pub playlists_removed: u64,
    /// Whether the manifest parsed cleanly (manifest mode)
    pub manifest_status: Option<ManifestStatus>,
}

impl ScanSummary {
    /// Total items classified this run.
    pub fn items_processed(&self) -> u64 {
        self.created + self.updated + self.unchanged + self.failed
    }
}

/// Orchestrates reconciliation runs against the catalog.
///
/// All collaborators are injected: repositories for storage access, a
/// `TagReader` for metadata, an `EventBus` for catalog-changed
/// notifications, and an optional `ProgressSink` for presentation.
pub struct Scanner {
    pub(crate) options: ScanOptions,
    pub(crate) tracks: Arc<dyn TrackRepository>,
    pub(crate) albums: Arc<dyn AlbumRepository>,
    pub(crate) artists: Arc<dyn ArtistRepository>,
    pub(crate) playlists: Arc<dyn PlaylistRepository>,
    pub(crate) event_bus: Arc<EventBus>,
    pub(crate) progress: Arc<dyn ProgressSink>,
    pub(crate) reconciler: ItemReconciler,
}

impl Scanner {
    /// Create a new scanner.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        options: ScanOptions,
        tracks: Arc<dyn TrackRepository>,
        albums: Arc<dyn AlbumRepository>,
        artists: Arc<dyn ArtistRepository>,
        playlists: Arc<dyn PlaylistRepository>,
        tag_reader: Arc<dyn TagReader>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let reconciler = ItemReconciler::new(
            tracks.clone(),
            albums.clone(),
            artists.clone(),
            tag_reader,
            options.requested_tags.clone(),
            options.force,
        );

        Self {
            options,
            tracks,
            albums,
            artists,
            playlists,
            event_bus,
            progress: Arc::new(NoopProgressSink),
            reconciler,
        }
    }

    /// Replace the default no-op progress sink.
    pub fn with_progress_sink(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Run a full reconciliation of the media root.
    ///
    /// Returns aggregate counts; a cancelled run returns
    /// `Err(ScanError::Cancelled)` after finishing in-flight items, without
    /// the orphan sweep or tidy.
    #[instrument(skip(self, token), fields(root = %self.options.media_root.display()))]
    pub async fn full_sync(&self, token: &CancellationToken) -> Result<ScanSummary> {
        let run_id = Uuid::new_v4().to_string();
        self.emit_scan(ScanEvent::Started {
            run_id: run_id.clone(),
            source: self.options.media_root.display().to_string(),
            is_manifest: false,
        });

        let started = Instant::now();
        let result = self
            .with_run_budget(self.execute_full_sync(&run_id, token))
            .await;

        self.finish_run(&run_id, started, result)
    }

    /// Import a parsed manifest for one user.
    ///
    /// Reconciles the manifest's tracks (locations normalized first), runs
    /// the orphan sweep, reconciles playlists, and tidies. A malformed
    /// manifest degrades to an empty run and is surfaced in the summary.
    #[instrument(skip(self, manifest, token), fields(user_id = %user_id))]
    pub async fn import_manifest(
        &self,
        manifest: &Manifest,
        user_id: &str,
        token: &CancellationToken,
    ) -> Result<ScanSummary> {
        let run_id = Uuid::new_v4().to_string();
        self.emit_scan(ScanEvent::Started {
            run_id: run_id.clone(),
            source: format!("manifest ({} tracks)", manifest.tracks.len()),
            is_manifest: true,
        });

        let started = Instant::now();
        let result = self
            .with_run_budget(self.execute_manifest_import(&run_id, manifest, user_id, token))
            .await;

        self.finish_run(&run_id, started, result)
    }

    /// Apply the optional run timeout budget.
    async fn with_run_budget(
        &self,
        run: impl std::future::Future<Output = Result<ScanSummary>>,
    ) -> Result<ScanSummary> {
        match self.options.timeout_secs {
            Some(secs) => match timeout(Duration::from_secs(secs), run).await {
                Ok(result) => result,
                Err(_) => Err(ScanError::Timeout(secs)),
            },
            None => run.await,
        }
    }

    fn finish_run(
        &self,
        run_id: &str,
        started: Instant,
        result: Result<ScanSummary>,
    ) -> Result<ScanSummary> {
        match result {
            Ok(summary) => {
                info!(
                    created = summary.created,
                    updated = summary.updated,
                    unchanged = summary.unchanged,
                    failed = summary.failed,
                    orphans_removed = summary.orphans_removed,
                    "Scan run completed"
                );
                self.emit_scan(ScanEvent::Completed {
                    run_id: run_id.to_string(),
                    created: summary.created,
                    updated: summary.updated,
                    unchanged: summary.unchanged,
                    failed: summary.failed,
                    orphans_removed: summary.orphans_removed,
                    duration_secs: started.elapsed().as_secs(),
                });
                self.progress.run_completed(&summary);
                Ok(summary)
            }
            Err(ScanError::Cancelled) => {
                info!("Scan run cancelled");
                self.emit_scan(ScanEvent::Cancelled {
                    run_id: run_id.to_string(),
                    items_processed: 0,
                });
                Err(ScanError::Cancelled)
            }
            Err(e) => {
                error!(error = %e, "Scan run failed");
                self.emit_scan(ScanEvent::Failed {
                    run_id: run_id.to_string(),
                    message: e.to_string(),
                    items_processed: 0,
                });
                Err(e)
            }
        }
    }

    async fn execute_full_sync(
        &self,
        run_id: &str,
        token: &CancellationToken,
    ) -> Result<ScanSummary> {
        info!("Phase 1: Discovering candidate files");
        let root = self.options.media_root.clone();
        let extensions = self.options.audio_extensions.clone();
        let candidates = tokio::task::spawn_blocking(move || {
            discovery::discover(&root, &extensions).collect::<Vec<_>>()
        })
        .await
        .map_err(|e| ScanError::Internal(format!("Discovery task failed: {}", e)))?;

        info!("Discovered {} candidate files", candidates.len());
        self.emit_scan(ScanEvent::Progress {
            run_id: run_id.to_string(),
            items_processed: 0,
            total_items: Some(candidates.len() as u64),
            phase: "discovering".to_string(),
        });

        let items: Vec<(PathBuf, Option<String>)> =
            candidates.into_iter().map(|path| (path, None)).collect();

        info!("Phase 2: Reconciling {} items", items.len());
        let (mut summary, retained) = self.reconcile_items(run_id, items, token).await?;

        info!("Phase 3: Sweeping orphans");
        summary.orphans_removed = self.orphan_sweep(&retained).await?;

        info!("Phase 4: Tidying derived entities");
        tidy(&self.tracks, &self.albums, &self.artists).await?;

        self.emit_catalog_changed(ChangeOrigin::FullSync);

        Ok(summary)
    }

    async fn execute_manifest_import(
        &self,
        run_id: &str,
        manifest: &Manifest,
        user_id: &str,
        token: &CancellationToken,
    ) -> Result<ScanSummary> {
        if manifest.status == ManifestStatus::Malformed {
            warn!("Manifest is malformed; treating as zero tracks and playlists");
        }

        info!(
            "Phase 1: Normalizing {} manifest locations",
            manifest.tracks.len()
        );
        let items: Vec<(PathBuf, Option<String>)> = manifest
            .tracks
            .iter()
            .map(|track| {
                let location = normalize_location(&track.location, &self.options.rewrite_rules);
                (PathBuf::from(location), Some(track.external_id.clone()))
            })
            .collect();

        info!("Phase 2: Reconciling {} items", items.len());
        let (mut summary, retained) = self.reconcile_items(run_id, items, token).await?;
        summary.manifest_status = Some(manifest.status);

        info!("Phase 3: Sweeping orphans");
        summary.orphans_removed = self.orphan_sweep(&retained).await?;

        info!(
            "Phase 4: Reconciling {} manifest playlists",
            manifest.playlists.len()
        );
        let playlist_reconciler =
            PlaylistReconciler::new(self.playlists.clone(), self.tracks.clone());
        let playlist_report = playlist_reconciler
            .reconcile(&manifest.playlists, user_id, &self.progress)
            .await?;
        summary.playlists_processed = playlist_report.processed;
        summary.playlists_removed = playlist_report.removed;

        info!("Phase 5: Tidying derived entities");
        tidy(&self.tracks, &self.albums, &self.artists).await?;

        self.emit_catalog_changed(ChangeOrigin::ManifestImport);

        Ok(summary)
    }

    /// Reconcile every item on the bounded worker pool, accumulating
    /// outcomes and the retention set.
    ///
    /// Extraction is I/O-bound and items have no cross-item dependency, so
    /// they run concurrently up to `max_concurrent_extractions`. Draining
    /// the join set is the synchronization barrier the orphan sweep relies
    /// on. When the token fires, queued items are skipped, in-flight items
    /// finish, and the run ends with `ScanError::Cancelled`.
    async fn reconcile_items(
        &self,
        run_id: &str,
        items: Vec<(PathBuf, Option<String>)>,
        token: &CancellationToken,
    ) -> Result<(ScanSummary, HashSet<String>)> {
        let total = items.len() as u64;
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_extractions.max(1)));
        let mut join_set: JoinSet<(PathBuf, String, Option<SyncOutcome>)> = JoinSet::new();

        for (path, external_id) in items {
            let semaphore = semaphore.clone();
            let reconciler = self.reconciler.clone();
            let token = token.clone();

            join_set.spawn(async move {
                let id = track_identity(&path);

                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (path, id, None),
                };

                // Cancellation checkpoint: item granularity
                if token.is_cancelled() {
                    return (path, id, None);
                }

                let outcome = reconciler.reconcile(&path, external_id.as_deref()).await;
                (path, id, Some(outcome))
            });
        }

        let mut summary = ScanSummary::default();
        let mut retained: HashSet<String> = HashSet::new();
        let mut processed = 0u64;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((path, id, Some(outcome))) => {
                    processed += 1;
                    match outcome {
                        SyncOutcome::Created => summary.created += 1,
                        SyncOutcome::Updated => summary.updated += 1,
                        SyncOutcome::Unchanged => summary.unchanged += 1,
                        SyncOutcome::Failed => summary.failed += 1,
                    }
                    // Failed items are retained too: extraction failure is
                    // not absence, and must never cost an existing record.
                    retained.insert(id);
                    self.progress.item_completed(&path, outcome);

                    if processed.is_multiple_of(10) || processed == total {
                        self.emit_scan(ScanEvent::Progress {
                            run_id: run_id.to_string(),
                            items_processed: processed,
                            total_items: Some(total),
                            phase: "reconciling".to_string(),
                        });
                    }
                }
                Ok((_, _, None)) => {
                    debug!("Item skipped after cancellation");
                }
                Err(e) => {
                    warn!(error = %e, "Reconcile task aborted");
                    summary.failed += 1;
                }
            }
        }

        if token.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        Ok((summary, retained))
    }

    /// Delete every persisted track absent from this run's retention set.
    ///
    /// Guarded by a store health check: an unreachable catalog aborts the
    /// run before any deletion, so a dead store can never be mistaken for
    /// an empty source.
    async fn orphan_sweep(&self, retained: &HashSet<String>) -> Result<u64> {
        self.tracks
            .count()
            .await
            .map_err(|e| ScanError::StoreUnavailable(e.to_string()))?;

        let mut removed = 0u64;
        for id in self.tracks.all_ids().await? {
            if !retained.contains(&id) && self.tracks.delete(&id).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Orphan sweep deleted stale tracks");
        }

        Ok(removed)
    }

    pub(crate) fn emit_scan(&self, event: ScanEvent) {
        self.event_bus.emit(CoreEvent::Scan(event)).ok();
    }

    pub(crate) fn emit_catalog_changed(&self, origin: ChangeOrigin) {
        self.event_bus
            .emit(CoreEvent::Catalog(CatalogEvent::Changed { origin }))
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestTrack;
    use async_trait::async_trait;
    use core_catalog::repositories::{
        MemoryAlbumRepository, MemoryArtistRepository, MemoryPlaylistRepository,
        MemoryTrackRepository,
    };
    use core_tags::{TagBundle, TagError};
    use std::path::Path;

    /// Tag reader that fabricates tags from the file name; paths containing
    /// "corrupt" fail extraction.
    struct StubTagReader;

    #[async_trait]
    impl TagReader for StubTagReader {
        async fn extract(&self, path: &Path) -> core_tags::Result<TagBundle> {
            if path.to_string_lossy().contains("corrupt") {
                return Err(TagError::ExtractionFailed {
                    path: path.to_path_buf(),
                    message: "corrupt".to_string(),
                });
            }
            Ok(TagBundle {
                title: path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string),
                artist: Some("Stub Artist".to_string()),
                album: Some("Stub Album".to_string()),
                duration_ms: 1000,
                mtime: 42,
                ..TagBundle::default()
            })
        }
    }

    struct Fixture {
        scanner: Scanner,
        tracks: Arc<MemoryTrackRepository>,
    }

    fn fixture_with_options(options: ScanOptions) -> Fixture {
        let tracks = Arc::new(MemoryTrackRepository::new());
        let scanner = Scanner::new(
            options,
            tracks.clone(),
            Arc::new(MemoryAlbumRepository::new()),
            Arc::new(MemoryArtistRepository::new()),
            Arc::new(MemoryPlaylistRepository::new()),
            Arc::new(StubTagReader),
            Arc::new(EventBus::new(100)),
        );
        Fixture { scanner, tracks }
    }

    fn manifest_of(entries: &[(&str, &str)]) -> Manifest {
        Manifest {
            tracks: entries
                .iter()
                .map(|(external_id, location)| ManifestTrack {
                    external_id: external_id.to_string(),
                    location: location.to_string(),
                })
                .collect(),
            playlists: Vec::new(),
            status: ManifestStatus::Parsed,
        }
    }

    #[tokio::test]
    async fn test_manifest_import_creates_and_sweeps() {
        let fx = fixture_with_options(ScanOptions::new("/music"));
        let token = CancellationToken::new();

        let summary = fx
            .scanner
            .import_manifest(
                &manifest_of(&[("100", "/music/a.mp3"), ("200", "/music/b.mp3")]),
                "user-1",
                &token,
            )
            .await
            .unwrap();
        assert_eq!(summary.created, 2);
        assert_eq!(summary.orphans_removed, 0);

        // Second import drops one track: it becomes an orphan
        let summary = fx
            .scanner
            .import_manifest(&manifest_of(&[("100", "/music/a.mp3")]), "user-1", &token)
            .await
            .unwrap();
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.orphans_removed, 1);
        assert_eq!(fx.tracks.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_manifest_import_applies_location_rewrites() {
        let mut options = ScanOptions::new("/music");
        options.rewrite_rules = vec!["/export".to_string(), "/music".to_string()];
        let fx = fixture_with_options(options);
        let token = CancellationToken::new();

        fx.scanner
            .import_manifest(
                &manifest_of(&[("100", "file:///export/a%20song.mp3")]),
                "user-1",
                &token,
            )
            .await
            .unwrap();

        assert!(fx
            .tracks
            .find_by_path("/music/a song.mp3")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_failed_extraction_retains_existing_record() {
        let fx = fixture_with_options(ScanOptions::new("/music"));
        let token = CancellationToken::new();

        fx.scanner
            .import_manifest(&manifest_of(&[("100", "/music/corrupt.mp3")]), "user-1", &token)
            .await
            .unwrap();
        // Nothing was created, so nothing to retain yet
        assert_eq!(fx.tracks.count().await.unwrap(), 0);

        // Create it while healthy, then fail it: the record must survive
        fx.scanner
            .import_manifest(&manifest_of(&[("100", "/music/ok.mp3")]), "user-1", &token)
            .await
            .unwrap();
        let summary = fx
            .scanner
            .import_manifest(
                &manifest_of(&[("100", "/music/ok.mp3"), ("200", "/music/corrupt.mp3")]),
                "user-1",
                &token,
            )
            .await
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(fx.tracks.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_surfaced_not_fatal() {
        let fx = fixture_with_options(ScanOptions::new("/music"));
        let token = CancellationToken::new();

        // An existing record would be orphaned by an empty manifest...
        fx.scanner
            .import_manifest(&manifest_of(&[("100", "/music/a.mp3")]), "user-1", &token)
            .await
            .unwrap();

        let summary = fx
            .scanner
            .import_manifest(&Manifest::malformed(), "user-1", &token)
            .await
            .unwrap();
        assert_eq!(summary.manifest_status, Some(ManifestStatus::Malformed));
        assert_eq!(summary.items_processed(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_sweep() {
        let fx = fixture_with_options(ScanOptions::new("/music"));

        fx.scanner
            .import_manifest(
                &manifest_of(&[("100", "/music/a.mp3")]),
                "user-1",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        // A pre-cancelled token: the empty-manifest import must NOT sweep
        let token = CancellationToken::new();
        token.cancel();
        let result = fx
            .scanner
            .import_manifest(&manifest_of(&[]), "user-1", &token)
            .await;

        assert!(matches!(result, Err(ScanError::Cancelled)));
        assert_eq!(fx.tracks.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_catalog_changed_emitted_once_per_run() {
        let fx = fixture_with_options(ScanOptions::new("/music"));
        let mut stream = fx.scanner.event_bus.subscribe();
        let token = CancellationToken::new();

        fx.scanner
            .import_manifest(&manifest_of(&[("100", "/music/a.mp3")]), "user-1", &token)
            .await
            .unwrap();

        let mut changed = 0;
        while let Ok(event) = stream.try_recv() {
            if matches!(event, CoreEvent::Catalog(CatalogEvent::Changed { .. })) {
                changed += 1;
            }
        }
        assert_eq!(changed, 1);
    }

    #[tokio::test]
    async fn test_run_timeout_is_enforced() {
        struct SlowReader;

        #[async_trait]
        impl TagReader for SlowReader {
            async fn extract(&self, _path: &Path) -> core_tags::Result<TagBundle> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(TagBundle::default())
            }
        }

        let mut options = ScanOptions::new("/music");
        options.timeout_secs = Some(1);
        let scanner = Scanner::new(
            options,
            Arc::new(MemoryTrackRepository::new()),
            Arc::new(MemoryAlbumRepository::new()),
            Arc::new(MemoryArtistRepository::new()),
            Arc::new(MemoryPlaylistRepository::new()),
            Arc::new(SlowReader),
            Arc::new(EventBus::new(100)),
        );

        let token = CancellationToken::new();
        let result = scanner
            .import_manifest(&manifest_of(&[("100", "/music/a.mp3")]), "user-1", &token)
            .await;
        assert!(matches!(result, Err(ScanError::Timeout(1))));
    }
}

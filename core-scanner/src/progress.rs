//! Progress reporting boundary
//!
//! The console/progress side channel is an optional observer: core logic
//! has zero dependency on presentation, and the absence of a sink must not
//! change sync results.

use crate::orchestrator::ScanSummary;
use crate::reconciler::SyncOutcome;
use std::path::Path;

/// Observer for per-item and per-playlist outcomes plus aggregate counts.
///
/// All methods have no-op defaults, so implementations override only what
/// they present.
pub trait ProgressSink: Send + Sync {
    /// One item finished reconciling.
    fn item_completed(&self, _path: &Path, _outcome: SyncOutcome) {}

    /// One manifest playlist finished reconciling.
    fn playlist_completed(&self, _name: &str, _outcome: SyncOutcome) {}

    /// A whole run finished.
    fn run_completed(&self, _summary: &ScanSummary) {}
}

/// The default sink: observes nothing.
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        items: AtomicUsize,
    }

    impl ProgressSink for CountingSink {
        fn item_completed(&self, _path: &Path, _outcome: SyncOutcome) {
            self.items.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_noop_sink_accepts_everything() {
        let sink = NoopProgressSink;
        sink.item_completed(Path::new("/music/a.mp3"), SyncOutcome::Created);
        sink.playlist_completed("Mix", SyncOutcome::Unchanged);
        sink.run_completed(&ScanSummary::default());
    }

    #[test]
    fn test_overridden_method_observes() {
        let sink = CountingSink::default();
        sink.item_completed(Path::new("/music/a.mp3"), SyncOutcome::Created);
        sink.item_completed(Path::new("/music/b.mp3"), SyncOutcome::Failed);
        // The playlist default stays a no-op
        sink.playlist_completed("Mix", SyncOutcome::Unchanged);

        assert_eq!(sink.items.load(Ordering::SeqCst), 2);
    }
}

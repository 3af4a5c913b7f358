//! # Scanner & Reconciliation Module
//!
//! Keeps the catalog truthful relative to its sources.
//!
//! ## Overview
//!
//! This module decides, for every discovered item, whether to insert,
//! update, skip, or remove a catalog record, and keeps playlist membership
//! and derived entities (albums, artists) consistent after any change. It
//! serves three triggers with different consistency guarantees:
//!
//! - **Full rescan** of the media root, ending in an orphan sweep
//! - **Single-path watch events**, applied incrementally with no sweep
//! - **Manifest import** from a third-party export, which additionally
//!   reconciles playlists keyed by their external identifiers
//!
//! ## Components
//!
//! - **Discovery** (`discovery`): enumerates candidate audio files
//! - **Hash Identity** (`identity`): location-addressed track identity
//! - **Item Reconciler** (`reconciler`): per-item classify and persist
//! - **Orchestrator** (`orchestrator`): drives a whole run, sweeps orphans
//! - **Watch Handler** (`watch`): incremental single-path reconciliation
//! - **Playlist Reconciler** (`playlists`): manifest playlist membership
//! - **Tidy** (`tidy`): garbage-collects unreferenced albums/artists
//! - **Manifest boundary** (`manifest`): parsed manifest values and
//!   location normalization

pub mod discovery;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod options;
pub mod orchestrator;
pub mod playlists;
pub mod progress;
pub mod reconciler;
pub mod tidy;
pub mod watch;

pub use error::{Result, ScanError};
pub use identity::{normalize_path, track_identity};
pub use manifest::{
    normalize_location, Manifest, ManifestPlaylist, ManifestSource, ManifestStatus, ManifestTrack,
};
pub use options::ScanOptions;
pub use orchestrator::{ScanSummary, Scanner};
pub use playlists::PlaylistSyncReport;
pub use progress::{NoopProgressSink, ProgressSink};
pub use reconciler::{ItemReconciler, SyncOutcome};
pub use tidy::TidyReport;
pub use watch::{ChangeEvent, PathKind, WatchRecord};

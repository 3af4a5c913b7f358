//! Manifest boundary
//!
//! A manifest is an external structured export from a third-party media
//! manager, listing tracks and playlists with its own identifiers. Parsing
//! the on-disk format is a collaborator's job behind `ManifestSource`; the
//! engine consumes the parsed values and owns location normalization.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Whether the manifest document carried the expected top-level structure.
///
/// A malformed manifest is treated as zero tracks and zero playlists for
/// the run rather than aborting, but the status is surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManifestStatus {
    /// All expected top-level keys were present.
    Parsed,
    /// Expected top-level keys were missing; contents treated as empty.
    Malformed,
}

/// One track entry in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestTrack {
    /// The manifest's own identifier for this track
    pub external_id: String,
    /// Location string, possibly a `file://` URL with percent-encoding
    pub location: String,
}

/// One playlist entry in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPlaylist {
    /// The manifest's own identifier for this playlist
    pub external_id: String,
    /// Display name; may repeat or be renamed upstream, so never a key
    pub name: String,
    /// Hidden playlists are skipped (still reported as processed)
    pub visible: bool,
    /// Ordered external track ids; `None` when the export carried no item
    /// list for this playlist
    pub items: Option<Vec<String>>,
}

/// A parsed manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub tracks: Vec<ManifestTrack>,
    pub playlists: Vec<ManifestPlaylist>,
    pub status: ManifestStatus,
}

impl Manifest {
    /// An empty, well-formed manifest.
    pub fn empty() -> Self {
        Self {
            tracks: Vec::new(),
            playlists: Vec::new(),
            status: ManifestStatus::Parsed,
        }
    }

    /// The manifest standing in for a malformed document.
    pub fn malformed() -> Self {
        Self {
            tracks: Vec::new(),
            playlists: Vec::new(),
            status: ManifestStatus::Malformed,
        }
    }
}

/// Parser boundary for the on-disk manifest format (an XML property list
/// in the exports this engine targets).
///
/// Implementations must map a document with missing top-level keys to
/// [`Manifest::malformed`] rather than an error, so one bad export degrades
/// to an empty run instead of aborting it.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Parse the manifest at `path`.
    async fn parse(&self, path: &Path) -> Result<Manifest>;
}

/// Normalize a manifest location string into a local path string.
///
/// Three steps, in order:
/// 1. Apply the ordered substring rewrites (find1, replace1, find2,
///    replace2, ...). An odd-length list is invalid input; the whole
///    rewrite step is skipped.
/// 2. Strip a `file://` scheme prefix.
/// 3. Percent-decode the remainder.
pub fn normalize_location(raw: &str, rewrites: &[String]) -> String {
    let mut location = raw.to_string();

    if rewrites.len() % 2 != 0 {
        warn!(
            entries = rewrites.len(),
            "Odd-length location rewrite list; skipping rewrites"
        );
    } else {
        for pair in rewrites.chunks_exact(2) {
            location = location.replace(&pair[0], &pair[1]);
        }
    }

    let location = match location.strip_prefix("file://") {
        Some(stripped) => stripped.to_string(),
        None => location,
    };

    match urlencoding::decode(&location) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => location,
    }
}

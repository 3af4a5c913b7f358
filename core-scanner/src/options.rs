//! Scan run configuration
//!
//! Configuration is an explicit value handed to the scanner at construction,
//! never ambient process-wide state.

use core_tags::TagField;
use std::path::PathBuf;

/// Configuration for reconciliation runs.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Root of the media directory tree
    pub media_root: PathBuf,

    /// Tag fields compared and overwritten when updating existing tracks.
    /// Empty means all fields. The modification time is always tracked
    /// regardless of this subset. New tracks are always fully populated.
    pub requested_tags: Vec<TagField>,

    /// Rewrite existing tracks even when no requested field differs
    pub force: bool,

    /// Ordered flat list of substring rewrites applied to manifest
    /// locations: find1, replace1, find2, replace2, ... An odd-length list
    /// is invalid and skipped entirely.
    pub rewrite_rules: Vec<String>,

    /// Audio file extensions accepted by discovery (lowercase)
    pub audio_extensions: Vec<String>,

    /// Maximum concurrent tag extractions. Extraction is I/O-bound and
    /// per-item reconciliation has no cross-item dependency, so items are
    /// processed on a bounded worker pool.
    pub max_concurrent_extractions: usize,

    /// Optional budget for a whole run, in seconds. `None` leaves run-time
    /// budgets to the caller.
    pub timeout_secs: Option<u64>,
}

impl ScanOptions {
    /// Options for the given media root, with defaults for everything else.
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
            requested_tags: Vec::new(),
            force: false,
            rewrite_rules: Vec::new(),
            audio_extensions: default_audio_extensions(),
            max_concurrent_extractions: 4,
            timeout_secs: None,
        }
    }
}

/// The default audio container extension whitelist.
pub fn default_audio_extensions() -> Vec<String> {
    [
        "mp3", "flac", "ogg", "oga", "opus", "m4a", "aac", "wav", "wave", "wma", "alac", "aiff",
        "aif", "ape", "wv",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ScanOptions::new("/music");
        assert_eq!(options.media_root, PathBuf::from("/music"));
        assert!(options.requested_tags.is_empty());
        assert!(!options.force);
        assert!(options.rewrite_rules.is_empty());
        assert!(options.audio_extensions.contains(&"mp3".to_string()));
        assert!(options.audio_extensions.contains(&"flac".to_string()));
        assert_eq!(options.max_concurrent_extractions, 4);
        assert!(options.timeout_secs.is_none());
    }
}

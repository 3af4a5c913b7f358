//! Candidate file discovery
//!
//! Enumerates audio files under a root directory as a lazy iterator.
//! Symbolic links are followed; directories that cannot be read are skipped
//! and logged rather than failing the walk. Enumeration order is not part
//! of the contract; callers must not depend on it for correctness.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Lazily enumerate files under `root` whose extension is in `extensions`
/// (matched case-insensitively), recursing into subdirectories and
/// following symbolic links.
pub fn discover(root: &Path, extensions: &[String]) -> impl Iterator<Item = PathBuf> {
    let whitelist: HashSet<String> = extensions.iter().map(|e| e.to_lowercase()).collect();

    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Skipping unreadable entry during discovery: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(move |path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| whitelist.contains(&ext.to_lowercase()))
                .unwrap_or(false)
        })
}

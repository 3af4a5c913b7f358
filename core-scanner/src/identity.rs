//! Location-addressed track identity
//!
//! A track's identity is the SHA-256 digest of its normalized path string.
//! Identity intentionally does not depend on file content: a file moved to
//! a new path is an entirely new item and the old record becomes an orphan
//! candidate.

use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` components and resolve `..`
/// against their parent where possible.
///
/// Normalization never touches the filesystem, so manifest locations hash
/// identically whether or not the file is currently readable, and symlinks
/// are deliberately not resolved: the path as enumerated is the identity.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Only pop a real name; `/..` stays at the root and a
                // leading `..` on a relative path is preserved.
                match normalized.components().next_back() {
                    Some(Component::Normal(_)) => {
                        normalized.pop();
                    }
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                    _ => normalized.push(component.as_os_str()),
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}

/// Derive the stable identity of a media item from its location.
///
/// Deterministic and collision-resistant: equal normalized paths always
/// yield equal ids, and distinct normalized paths yield distinct ids.
pub fn track_identity(path: &Path) -> String {
    let normalized = normalize_path(path);
    let mut hasher = Sha256::new();
    hasher.update(normalized.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_stable() {
        let path = Path::new("/music/artist/album/track.mp3");
        assert_eq!(track_identity(path), track_identity(path));
    }

    #[test]
    fn test_identity_distinguishes_paths() {
        assert_ne!(
            track_identity(Path::new("/music/a.mp3")),
            track_identity(Path::new("/music/b.mp3"))
        );
    }

    #[test]
    fn test_identity_is_hex_digest() {
        let id = track_identity(Path::new("/music/a.mp3"));
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_normalize_drops_cur_dir() {
        assert_eq!(
            normalize_path(Path::new("/music/./a.mp3")),
            PathBuf::from("/music/a.mp3")
        );
    }

    #[test]
    fn test_normalize_resolves_parent_dir() {
        assert_eq!(
            normalize_path(Path::new("/music/ignored/../a.mp3")),
            PathBuf::from("/music/a.mp3")
        );
    }

    #[test]
    fn test_normalize_keeps_root_on_excess_parents() {
        assert_eq!(normalize_path(Path::new("/../a.mp3")), PathBuf::from("/a.mp3"));
    }

    #[test]
    fn test_equivalent_spellings_share_identity() {
        assert_eq!(
            track_identity(Path::new("/music/./x/../a.mp3")),
            track_identity(Path::new("/music/a.mp3"))
        );
    }
}

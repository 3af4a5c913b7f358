//! Audio tag extraction
//!
//! This module defines the extraction boundary consumed by the reconciler
//! and a `lofty`-backed implementation. It supports ID3v2, Vorbis Comments,
//! MP4 tags, and FLAC.
//!
//! ## Overview
//!
//! - Extracts the tag fields the catalog tracks (title, artist, album, ...)
//! - Always reports the file's modification time
//! - Hashes the embedded front cover with SHA-256 to produce a stable
//!   embedded-art reference
//! - Extraction failures are reported as errors for the caller to classify;
//!   they never panic or abort a run

use crate::error::{Result, TagError};
use async_trait::async_trait;
use lofty::config::ParseOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;
use std::time::UNIX_EPOCH;
use tracing::debug;

/// The tag fields a sync run may be restricted to.
///
/// The modification time is not listed here: it is implicitly tracked by
/// every run regardless of the requested subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagField {
    Title,
    Artist,
    AlbumArtist,
    Album,
    Duration,
    TrackNumber,
    Lyrics,
    Artwork,
}

impl TagField {
    /// Every field, in the order they appear on a track record.
    pub const ALL: [TagField; 8] = [
        TagField::Title,
        TagField::Artist,
        TagField::AlbumArtist,
        TagField::Album,
        TagField::Duration,
        TagField::TrackNumber,
        TagField::Lyrics,
        TagField::Artwork,
    ];
}

impl FromStr for TagField {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(TagField::Title),
            "artist" => Ok(TagField::Artist),
            "album_artist" | "albumartist" => Ok(TagField::AlbumArtist),
            "album" => Ok(TagField::Album),
            "duration" => Ok(TagField::Duration),
            "track_number" | "tracknumber" | "track" => Ok(TagField::TrackNumber),
            "lyrics" => Ok(TagField::Lyrics),
            "artwork" | "cover" => Ok(TagField::Artwork),
            other => Err(TagError::UnknownField(other.to_string())),
        }
    }
}

/// Tag fields extracted from one audio file.
///
/// Absent tags stay `None`; the reconciler decides fallbacks (file-stem
/// title, sentinel artist/album) so every `TagReader` implementation
/// behaves identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagBundle {
    /// Track title
    pub title: Option<String>,
    /// Primary artist
    pub artist: Option<String>,
    /// Album artist (for compilations)
    pub album_artist: Option<String>,
    /// Album name
    pub album: Option<String>,
    /// Duration in milliseconds
    pub duration_ms: i64,
    /// Track position on album
    pub track_number: Option<i32>,
    /// Embedded lyrics
    pub lyrics: Option<String>,
    /// Embedded-art reference (SHA-256 of the front cover image)
    pub artwork_id: Option<String>,
    /// File modification time (unix seconds)
    pub mtime: i64,
}

/// Tag reader interface consumed by the reconciler.
///
/// Implementations must report the modification time alongside the tag
/// fields. Errors propagate to the caller as failed outcomes, never as
/// aborts of the whole run.
#[async_trait]
pub trait TagReader: Send + Sync {
    /// Extract tag fields and the modification time from one file.
    async fn extract(&self, path: &Path) -> Result<TagBundle>;
}

/// Audio tag reader backed by the `lofty` crate.
pub struct LoftyTagReader {
    parse_options: ParseOptions,
}

impl LoftyTagReader {
    /// Create a new tag reader with default parse options
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new(),
        }
    }

    /// Create a tag reader with custom parse options
    pub fn with_options(parse_options: ParseOptions) -> Self {
        Self { parse_options }
    }

    /// Normalize text metadata
    ///
    /// - Trims leading/trailing whitespace
    /// - Normalizes consecutive whitespace to single space
    /// - Removes control characters
    fn normalize_text(text: &str) -> String {
        text.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .filter(|c| !c.is_control())
            .collect()
    }

    fn non_empty(text: Option<String>) -> Option<String> {
        text.map(|s| Self::normalize_text(&s)).filter(|s| !s.is_empty())
    }

    /// SHA-256 hex digest of the embedded front cover, if any.
    ///
    /// Falls back to the first picture when no cover-front picture exists.
    fn artwork_reference(tag: &lofty::tag::Tag) -> Option<String> {
        let pictures = tag.pictures();
        let picture = pictures
            .iter()
            .find(|p| p.pic_type() == lofty::picture::PictureType::CoverFront)
            .or_else(|| pictures.first())?;

        if picture.data().is_empty() {
            return None;
        }

        let mut hasher = Sha256::new();
        hasher.update(picture.data());
        Some(format!("{:x}", hasher.finalize()))
    }
}

impl Default for LoftyTagReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TagReader for LoftyTagReader {
    async fn extract(&self, path: &Path) -> Result<TagBundle> {
        debug!("Extracting tags from: {}", path.display());

        let metadata = tokio::fs::metadata(path).await?;
        let mtime = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let file_data = tokio::fs::read(path).await?;

        let extraction_failed = |message: String| TagError::ExtractionFailed {
            path: path.to_path_buf(),
            message,
        };

        let tagged_file = Probe::new(std::io::Cursor::new(&file_data))
            .options(self.parse_options)
            .guess_file_type()
            .map_err(|e| extraction_failed(format!("Failed to probe file: {}", e)))?
            .read()
            .map_err(|e| extraction_failed(format!("Failed to parse file: {}", e)))?;

        let duration_ms = tagged_file.properties().duration().as_millis() as i64;

        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

        let bundle = if let Some(tag) = tag {
            TagBundle {
                title: Self::non_empty(tag.title().map(|s| s.to_string())),
                artist: Self::non_empty(tag.artist().map(|s| s.to_string())),
                album_artist: Self::non_empty(
                    tag.get_string(&ItemKey::AlbumArtist).map(|s| s.to_string()),
                ),
                album: Self::non_empty(tag.album().map(|s| s.to_string())),
                duration_ms,
                track_number: tag.track().map(|n| n as i32),
                lyrics: Self::non_empty(tag.get_string(&ItemKey::Lyrics).map(|s| s.to_string())),
                artwork_id: Self::artwork_reference(tag),
                mtime,
            }
        } else {
            debug!("No tags found in file: {}", path.display());
            TagBundle {
                duration_ms,
                mtime,
                ..TagBundle::default()
            }
        };

        Ok(bundle)
    }
}

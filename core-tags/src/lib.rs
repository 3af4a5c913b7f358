//! # Tag Extraction Module
//!
//! The tag-extraction boundary of the catalog engine.
//!
//! ## Overview
//!
//! This module provides:
//! - The `TagReader` trait the reconciler consumes
//! - The `TagBundle` value a reader produces per file
//! - The `TagField` vocabulary used to restrict which fields a sync run
//!   compares and overwrites
//! - `LoftyTagReader`, a `lofty`-backed implementation supporting ID3v2,
//!   Vorbis Comments, MP4 tags, and FLAC

pub mod error;
pub mod extractor;

pub use error::{Result, TagError};
pub use extractor::{LoftyTagReader, TagBundle, TagField, TagReader};

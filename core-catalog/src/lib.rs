//! # Catalog Module
//!
//! Owns the canonical media catalog database and provides repository
//! patterns for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Immutable value types for tracks, albums, artists, playlists
//! - Repository traits with SQLite and in-memory implementations
//!
//! The sentinel "unknown artist", "various artists", and "unknown album"
//! rows are seeded by the initial migration and are never garbage-collected.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{CatalogError, Result};
pub use models::{
    Album, Artist, Playlist, Track, UNKNOWN_ALBUM_ID, UNKNOWN_ARTIST_ID, VARIOUS_ARTISTS_ID,
};

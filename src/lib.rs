//! Workspace umbrella crate.
//!
//! This crate exists so host applications can depend on `chorus-workspace`
//! and reach every core crate through a single dependency instead of wiring
//! `core-runtime`, `core-catalog`, `core-tags`, and `core-scanner`
//! individually.

pub use core_catalog as catalog;
pub use core_runtime as runtime;
pub use core_scanner as scanner;
pub use core_tags as tags;

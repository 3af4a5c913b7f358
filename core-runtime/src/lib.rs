//! # Runtime Module
//!
//! Shared runtime infrastructure for the Chorus core crates.
//!
//! ## Overview
//!
//! This module provides:
//! - Typed event bus for decoupled communication between modules
//! - Structured logging bootstrap built on `tracing`
//! - Runtime error types

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{CatalogEvent, ChangeOrigin, CoreEvent, EventBus, EventStream, ScanEvent};
pub use logging::{init_logging, LogFormat, LoggingConfig};

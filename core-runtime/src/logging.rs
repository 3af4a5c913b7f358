//! # Logging & Tracing Infrastructure
//!
//! Provides structured logging with the `tracing` crate, supporting:
//! - Pretty, compact, and JSON output formats
//! - Module-level filtering via `RUST_LOG`-style directives
//! - A process-wide, idempotent initialization entry point
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Pretty)
//!     .with_directives("info,core_scanner=debug");
//!
//! init_logging(config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-oriented output for development.
    Pretty,
    /// Single-line output for terminals and log files.
    Compact,
    /// Structured JSON output for log aggregation pipelines.
    Json,
}

/// Configuration for the logging subsystem.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directives, e.g. `"info"` or `"info,core_scanner=debug"`.
    /// The `RUST_LOG` environment variable overrides this when set.
    pub directives: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to include the event's target module in output.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directives: "info".to_string(),
            format: LogFormat::Compact,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the default filter directives.
    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = directives.into();
        self
    }

    /// Set whether the event target is included in output.
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global `tracing` subscriber.
///
/// Safe to call more than once: subsequent calls are no-ops. The first call
/// wins, which keeps test binaries (where many tests may try to initialize
/// logging) from panicking on double registration.
///
/// # Errors
///
/// Returns an error if the filter directives cannot be parsed or the global
/// subscriber cannot be installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.directives))
        .map_err(|e| Error::Config(format!("Invalid log directives: {}", e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| Error::Config(format!("Failed to install subscriber: {}", e)))?;

    tracing::debug!("Logging initialized");
    Ok(())
}

//! # Event Bus System
//!
//! Provides an event-driven architecture for the Chorus core using
//! `tokio::sync::broadcast`. This module enables decoupled communication
//! between core modules through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CatalogEvent, ChangeOrigin, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! let event = CoreEvent::Catalog(CatalogEvent::Changed {
//!     origin: ChangeOrigin::FullSync,
//! });
//! event_bus.emit(event).ok();
//! ```
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two kinds
//! of receive errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n`
//!   events. This is non-fatal; the subscriber can continue receiving new
//!   events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates
//!   shutdown.
//!
//! Subscribers should handle `Lagged` gracefully and treat `Closed` as a
//! signal to exit.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// This value balances memory usage with the ability to handle bursts of
/// events. Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
/// It wraps domain-specific event types for different modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Scan/reconciliation run events
    Scan(ScanEvent),
    /// Catalog content change events
    Catalog(CatalogEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Scan(e) => e.description(),
            CoreEvent::Catalog(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Scan(ScanEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Scan(ScanEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Catalog(CatalogEvent::Changed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Scan Events
// ============================================================================

/// Events related to reconciliation runs (full sync, manifest import).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ScanEvent {
    /// Reconciliation run initiated.
    Started {
        /// Unique identifier for this run.
        run_id: String,
        /// Root path or manifest path being reconciled.
        source: String,
        /// Whether the run is driven by a manifest rather than the filesystem.
        is_manifest: bool,
    },
    /// Incremental progress update during a run.
    Progress {
        /// The run ID.
        run_id: String,
        /// Number of items processed so far.
        items_processed: u64,
        /// Total items to process (unknown during discovery).
        total_items: Option<u64>,
        /// Current phase (e.g., "discovering", "reconciling").
        phase: String,
    },
    /// Run finished successfully.
    Completed {
        /// The run ID.
        run_id: String,
        /// Number of new tracks created.
        created: u64,
        /// Number of tracks updated.
        updated: u64,
        /// Number of tracks left untouched.
        unchanged: u64,
        /// Number of items that failed extraction or persistence.
        failed: u64,
        /// Number of orphaned tracks removed by the sweep.
        orphans_removed: u64,
        /// Duration of the run in seconds.
        duration_secs: u64,
    },
    /// Run encountered a fatal error and stopped.
    Failed {
        /// The run ID.
        run_id: String,
        /// Human-readable error message.
        message: String,
        /// Number of items processed before failure.
        items_processed: u64,
    },
    /// Run was cancelled before completion.
    Cancelled {
        /// The run ID.
        run_id: String,
        /// Number of items processed before cancellation.
        items_processed: u64,
    },
}

impl ScanEvent {
    fn description(&self) -> &str {
        match self {
            ScanEvent::Started { .. } => "Scan started",
            ScanEvent::Progress { .. } => "Scan in progress",
            ScanEvent::Completed { .. } => "Scan completed successfully",
            ScanEvent::Failed { .. } => "Scan failed",
            ScanEvent::Cancelled { .. } => "Scan cancelled",
        }
    }
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Which operation mutated the catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A full filesystem reconciliation run.
    FullSync,
    /// A manifest import run.
    ManifestImport,
    /// A single filesystem watch event.
    Watch,
}

impl fmt::Display for ChangeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOrigin::FullSync => write!(f, "full-sync"),
            ChangeOrigin::ManifestImport => write!(f, "manifest-import"),
            ChangeOrigin::Watch => write!(f, "watch"),
        }
    }
}

/// Events related to catalog content changes.
///
/// Downstream consumers (cache invalidation, UI refresh) subscribe to these;
/// producers emit exactly one `Changed` per mutating operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// The catalog was mutated and downstream state should be refreshed.
    Changed {
        /// The operation that caused the mutation.
        origin: ChangeOrigin,
    },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::Changed { .. } => "Catalog changed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all
    /// future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering
/// capabilities.
///
/// This provides a more ergonomic API for consuming events with optional
/// filtering by event type or severity.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let mut catalog_stream = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Catalog(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// This will skip events that don't match the filter and return the next
    /// matching event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events. Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

//! # Lifecycle events distributed by the bus.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Run-level events**: fired once per run (`BeforeStart`,
//!   `AfterResourcesCreated`, `Shutdown`); they carry no resource id.
//! - **Per-resource events**: fired for each resource lifecycle edge
//!   (`ResourceReady`, `ResourceStopped`); they carry the resource id.
//!
//! The [`Envelope`] struct is immutable once created and ephemeral: it is never
//! persisted, and a subscriber that misses an event does not see it later.
//!
//! ## Ordering guarantees
//! Each envelope has a globally unique sequence number (`seq`) that increases
//! monotonically. For a single resource id, envelopes are published in
//! transition order; cross-resource ordering is unspecified.
//!
//! ## Example
//! ```rust
//! use lifevisor::{Envelope, EventKind};
//!
//! let ev = Envelope::new(EventKind::ResourceReady).for_resource("cache");
//!
//! assert_eq!(ev.kind, EventKind::ResourceReady);
//! assert_eq!(ev.resource.as_deref(), Some("cache"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Run-level events ===
    /// The host is about to start its resources.
    ///
    /// Fires once per run, before any resource reaches `Ready`. Subscribers
    /// that need the full resource set should snapshot the registry when this
    /// fires.
    BeforeStart,

    /// All resources have been created by the host.
    ///
    /// Fires once per run; used only to arm shutdown hooks.
    AfterResourcesCreated,

    /// The host's termination sequence has begun.
    ///
    /// Fires once per run, after the shutdown signal is observed.
    Shutdown,

    // === Per-resource events ===
    /// A resource transitioned to `Ready`.
    ///
    /// Sets `resource` to the resource id.
    ResourceReady,

    /// A resource transitioned to `Stopped`.
    ///
    /// Sets `resource` to the resource id.
    ResourceStopped,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::BeforeStart => "before_start",
            EventKind::AfterResourcesCreated => "after_resources_created",
            EventKind::Shutdown => "shutdown",
            EventKind::ResourceReady => "resource_ready",
            EventKind::ResourceStopped => "resource_stopped",
        }
    }
}

/// Immutable lifecycle event record.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs and notification timestamps)
/// - `resource`: resource id for per-resource kinds, `None` for run-level kinds
#[derive(Clone, Debug)]
pub struct Envelope {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Id of the resource this event refers to, if any.
    pub resource: Option<Arc<str>>,
}

impl Envelope {
    /// Creates a new envelope of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            resource: None,
        }
    }

    /// Attaches the resource id this event refers to.
    #[inline]
    pub fn for_resource(mut self, id: impl Into<Arc<str>>) -> Self {
        self.resource = Some(id.into());
        self
    }
}

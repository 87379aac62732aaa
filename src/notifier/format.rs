//! # Message formatting: pure functions from events to notifications.
//!
//! Formatting is total and side-effect free: a fixed table keyed by
//! [`ResourceKind`] picks the emoji, and the event kind picks the color and
//! phrasing. The timestamp comes from the envelope, not the clock, so the
//! same inputs always format to the same message.

use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::events::EventKind;
use crate::registry::{Resource, ResourceKind};
use crate::sink::NotificationMessage;

/// Accent color for a resource becoming ready (Discord green).
pub const COLOR_READY: u32 = 0x57F287;
/// Accent color for a resource stopping (neutral gray).
pub const COLOR_STOPPED: u32 = 0x95A5A6;
/// Accent color for the run-level startup message (Discord blurple).
pub const COLOR_STARTUP: u32 = 0x5865F2;
/// Accent color for the run-level shutdown message (Discord red).
pub const COLOR_SHUTDOWN: u32 = 0xED4245;

/// Emoji prefix for a resource kind.
fn emoji(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Container => "📦",
        ResourceKind::Process => "⚙️",
        ResourceKind::Logical => "🧩",
        ResourceKind::Value => "🔧",
    }
}

/// Capitalized kind noun for message bodies.
fn kind_noun(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Container => "Container",
        ResourceKind::Process => "Process",
        ResourceKind::Logical => "Component",
        ResourceKind::Value => "Value",
    }
}

/// Formats the per-resource notification for a lifecycle event.
///
/// Returns `None` for run-level kinds (`BeforeStart`, `AfterResourcesCreated`,
/// `Shutdown`), which have their own formatters below.
pub fn lifecycle_message(
    resource: &Resource,
    kind: EventKind,
    at: SystemTime,
) -> Option<NotificationMessage> {
    let at = DateTime::<Utc>::from(at);
    match kind {
        EventKind::ResourceReady => Some(NotificationMessage {
            title: format!("{} {} is ready", emoji(resource.kind), resource.display_name),
            body: format!(
                "{} '{}' is now ready.",
                kind_noun(resource.kind),
                resource.display_name
            ),
            color: COLOR_READY,
            at,
        }),
        EventKind::ResourceStopped => Some(NotificationMessage {
            title: format!("{} {} stopped", emoji(resource.kind), resource.display_name),
            body: format!(
                "{} '{}' has stopped.",
                kind_noun(resource.kind),
                resource.display_name
            ),
            color: COLOR_STOPPED,
            at,
        }),
        EventKind::BeforeStart | EventKind::AfterResourcesCreated | EventKind::Shutdown => None,
    }
}

/// Formats the run-level "starting" summary.
pub fn startup_message(resource_count: usize, at: SystemTime) -> NotificationMessage {
    let noun = if resource_count == 1 {
        "resource"
    } else {
        "resources"
    };
    NotificationMessage {
        title: "🚀 Environment starting".to_string(),
        body: format!("Starting {resource_count} {noun}."),
        color: COLOR_STARTUP,
        at: DateTime::<Utc>::from(at),
    }
}

/// Formats the run-level "shutting down" message.
pub fn shutdown_message(at: SystemTime) -> NotificationMessage {
    NotificationMessage {
        title: "🛑 Environment shutting down".to_string(),
        body: "The environment is shutting down.".to_string(),
        color: COLOR_SHUTDOWN,
        at: DateTime::<Utc>::from(at),
    }
}

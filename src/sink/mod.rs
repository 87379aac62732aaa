//! Notification sinks: delivery of formatted messages to an external channel.
//!
//! The [`NotifySink`] trait abstracts the outbound side of the notifier; the
//! built-in [`DiscordSink`] posts Discord-flavored embed payloads to a webhook
//! URL. Sinks are stateless and safe for concurrent use; each call is
//! independent, bounded by a timeout, and never retried.

mod discord;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DeliveryError;

pub use discord::DiscordSink;

/// A formatted notification, produced by the notifier per event and consumed
/// exactly once by a sink.
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    /// Short headline (embed title).
    pub title: String,
    /// Longer description (embed body).
    pub body: String,
    /// Accent color as an RGB integer.
    pub color: u32,
    /// Wall-clock time of the underlying event.
    pub at: DateTime<Utc>,
}

/// Contract for notification delivery.
///
/// Implementations must be stateless with respect to individual calls and must
/// bound their own I/O: a `deliver` that hangs past the caller's patience is
/// abandoned, not retried.
#[async_trait]
pub trait NotifySink: Send + Sync + 'static {
    /// Delivers a single message to the external channel.
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

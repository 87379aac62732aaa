//! Lifecycle events and the in-process event bus.
//!
//! This module contains the notifier's event core:
//! - [`event`]: the immutable [`Envelope`] record and its [`EventKind`] classification;
//! - [`bus`]: the [`EventBus`], a typed publish/subscribe hub keyed by event kind
//!   and optional resource identity, plus the [`Subscribe`] handler trait.

mod bus;
mod event;

pub use bus::{EventBus, Subscribe, SubscriptionHandle};
pub use event::{Envelope, EventKind};

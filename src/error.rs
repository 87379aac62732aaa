//! Error types used by the lifevisor registry and delivery path.
//!
//! This module defines two main error enums:
//!
//! - [`RegistryError`] — state-machine violations raised by the resource registry.
//! - [`DeliveryError`] — sink communication failures (timeout, transport, non-2xx).
//!
//! Registry errors are programming errors and propagate to the caller for
//! visibility. Delivery errors are operational: they are caught at the
//! [`NotifierService`](crate::NotifierService) boundary, logged, and discarded —
//! never retried, never escalated. No error from this crate may abort host
//! startup or shutdown.

use std::time::Duration;
use thiserror::Error;

use crate::registry::ResourceState;

/// # Errors produced by the resource registry.
///
/// These represent violations of the registration contract or the monotonic
/// lifecycle state machine. They are surfaced to the caller, never silently
/// dropped, and are fatal only to the offending call.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A resource was registered under an id that is already in use.
    #[error("resource id already registered: {id}")]
    DuplicateId {
        /// The contested resource id.
        id: String,
    },

    /// A transition was requested for an id the registry has never seen.
    #[error("unknown resource: {id}")]
    UnknownResource {
        /// The unrecognized resource id.
        id: String,
    },

    /// The requested state does not follow the current state per the
    /// lifecycle ordering `Pending → Starting → Ready → Stopped | Failed`
    /// (with the permitted restart cycle `Stopped | Failed → Starting`).
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// The resource id.
        id: String,
        /// State the resource was in when the transition was requested.
        from: ResourceState,
        /// The rejected target state.
        to: ResourceState,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use lifevisor::RegistryError;
    ///
    /// let err = RegistryError::UnknownResource { id: "ghost".into() };
    /// assert_eq!(err.as_label(), "registry_unknown_resource");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DuplicateId { .. } => "registry_duplicate_id",
            RegistryError::UnknownResource { .. } => "registry_unknown_resource",
            RegistryError::InvalidTransition { .. } => "registry_invalid_transition",
        }
    }
}

/// # Errors produced by notification delivery.
///
/// These represent failures talking to the external sink. They are always
/// contained: the notifier logs them as warnings and moves on. A failed
/// delivery is never retried and never blocks subsequent, independent
/// notifications.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The sink did not respond within the configured delivery timeout.
    #[error("delivery timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The sink responded with a non-2xx status code.
    #[error("webhook returned status {status}")]
    Http {
        /// The HTTP status code received.
        status: u16,
    },

    /// Transport-level failure (DNS, connect, TLS, broken pipe).
    #[error("network failure: {message}")]
    Network {
        /// The underlying error message.
        message: String,
    },
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Timeout { .. } => "delivery_timeout",
            DeliveryError::Http { .. } => "delivery_http_status",
            DeliveryError::Network { .. } => "delivery_network",
        }
    }
}

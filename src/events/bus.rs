//! # Event bus: typed publish/subscribe keyed by kind and resource identity.
//!
//! [`EventBus`] delivers each published [`Envelope`] to the handlers whose
//! subscription matches it: the exact `(kind, resource)` subscriptions plus the
//! global `(kind, None)` subscriptions for that kind.
//!
//! ## Architecture
//! ```text
//! Publishers (registry, host):          Subscriptions (registered at setup):
//!   transition(..) ──┐
//!   BeforeStart    ──┼──► publish(Envelope) ──► (kind, Some(id)) handlers
//!   Shutdown       ──┘                    └──► (kind, None) handlers (global)
//! ```
//!
//! ## Rules
//! - **Synchronous delivery**: handlers run inside the `publish` call, one
//!   after another. Per-resource ordering therefore follows publish order.
//! - **Isolation**: a handler panic is caught and logged; it never reaches
//!   other handlers or the publisher.
//! - **Bounded handlers**: each handler invocation is limited by the bus
//!   delivery timeout; on timeout the invocation is abandoned and logged,
//!   not retried.
//! - **No persistence**: an envelope published with no matching subscription
//!   is dropped.
//!
//! Subscriptions are expected to be static: registered once during setup, with
//! [`EventBus::unsubscribe`] available but not required by the minimal design.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::warn;

use super::event::{Envelope, EventKind};

/// Contract for event handlers.
///
/// Called inline from `publish`. Implementations should avoid blocking the
/// async runtime (prefer async I/O and cooperative waits); a handler that
/// exceeds the bus delivery timeout is abandoned for that event.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    ///
    /// # Parameters
    /// - `event`: Reference to the envelope (does not transfer ownership)
    async fn on_event(&self, event: &Envelope);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Subscription routing key: event kind plus optional resource identity.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct SubKey {
    kind: EventKind,
    resource: Option<Arc<str>>,
}

/// One registered handler within a routing bucket.
struct Entry {
    id: u64,
    handler: Arc<dyn Subscribe>,
}

struct BusInner {
    subs: RwLock<HashMap<SubKey, Vec<Entry>>>,
    next_id: AtomicU64,
    delivery_timeout: Duration,
}

/// Opaque handle returned by [`EventBus::subscribe`].
///
/// Keep it around only if you intend to call [`EventBus::unsubscribe`];
/// dropping the handle does not remove the subscription.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: u64,
    key: SubKey,
}

/// Typed publish/subscribe hub for lifecycle events.
///
/// Cheap to clone (internally holds an `Arc`); constructed once per run and
/// passed by handle to whichever component needs to publish or subscribe —
/// there is no ambient singleton.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates a new bus with the given per-handler delivery timeout.
    ///
    /// A zero timeout is clamped to one millisecond.
    pub fn new(delivery_timeout: Duration) -> Self {
        let delivery_timeout = delivery_timeout.max(Duration::from_millis(1));
        Self {
            inner: Arc::new(BusInner {
                subs: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                delivery_timeout,
            }),
        }
    }

    /// Registers a handler for the given kind and optional resource id.
    ///
    /// - `resource = None` creates a **global** subscription: it receives every
    ///   event of that kind regardless of resource.
    /// - `resource = Some(id)` receives only events carrying exactly that id.
    ///
    /// Handlers registered for the same key are invoked in registration order.
    pub async fn subscribe(
        &self,
        kind: EventKind,
        resource: Option<&str>,
        handler: Arc<dyn Subscribe>,
    ) -> SubscriptionHandle {
        let key = SubKey {
            kind,
            resource: resource.map(Arc::from),
        };
        let id = self.inner.next_id.fetch_add(1, AtomicOrdering::Relaxed);

        let mut subs = self.inner.subs.write().await;
        subs.entry(key.clone())
            .or_default()
            .push(Entry { id, handler });

        SubscriptionHandle { id, key }
    }

    /// Removes a previously registered subscription.
    ///
    /// Idempotent: unsubscribing twice is a no-op.
    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let mut subs = self.inner.subs.write().await;
        if let Some(bucket) = subs.get_mut(&handle.key) {
            bucket.retain(|e| e.id != handle.id);
            if bucket.is_empty() {
                subs.remove(&handle.key);
            }
        }
    }

    /// Publishes an envelope, delivering it to every matching handler.
    ///
    /// Delivery is at-least-once and synchronous-per-handler: this call
    /// returns after every matching handler has completed, panicked, or been
    /// abandoned on timeout. Handler failures never propagate to the
    /// publisher or to other handlers.
    pub async fn publish(&self, ev: Envelope) {
        let matched = self.matching_handlers(&ev).await;
        for handler in matched {
            self.deliver(&handler, &ev).await;
        }
    }

    /// Number of live subscriptions (all keys), for introspection and tests.
    pub async fn subscription_count(&self) -> usize {
        let subs = self.inner.subs.read().await;
        subs.values().map(Vec::len).sum()
    }

    /// Collects handlers matching the envelope: global bucket first, then the
    /// exact per-resource bucket. Handler `Arc`s are cloned out so the lock is
    /// released before any handler runs (handlers may subscribe re-entrantly).
    async fn matching_handlers(&self, ev: &Envelope) -> Vec<Arc<dyn Subscribe>> {
        let subs = self.inner.subs.read().await;
        let mut matched = Vec::new();

        let global = SubKey {
            kind: ev.kind,
            resource: None,
        };
        if let Some(bucket) = subs.get(&global) {
            matched.extend(bucket.iter().map(|e| Arc::clone(&e.handler)));
        }

        if let Some(id) = &ev.resource {
            let keyed = SubKey {
                kind: ev.kind,
                resource: Some(Arc::clone(id)),
            };
            if let Some(bucket) = subs.get(&keyed) {
                matched.extend(bucket.iter().map(|e| Arc::clone(&e.handler)));
            }
        }

        matched
    }

    /// Runs a single handler under the delivery timeout with panic isolation.
    async fn deliver(&self, handler: &Arc<dyn Subscribe>, ev: &Envelope) {
        let fut = AssertUnwindSafe(handler.on_event(ev)).catch_unwind();
        match tokio::time::timeout(self.inner.delivery_timeout, fut).await {
            Ok(Ok(())) => {}
            Ok(Err(panic_err)) => {
                warn!(
                    handler = handler.name(),
                    event = ev.kind.as_label(),
                    "event handler panicked: {panic_err:?}"
                );
            }
            Err(_) => {
                warn!(
                    handler = handler.name(),
                    event = ev.kind.as_label(),
                    timeout = ?self.inner.delivery_timeout,
                    "event handler exceeded delivery timeout; abandoned"
                );
            }
        }
    }
}

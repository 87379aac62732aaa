//! # Resource registry: the single source of truth for resource state.
//!
//! [`ResourceRegistry`] tracks the dynamic set of managed resources (identity,
//! kind, lifecycle state) and publishes the matching [`Envelope`] on every
//! successful transition to `Ready` or `Stopped`. This is the integration
//! point between the registry and the bus.
//!
//! ## Architecture
//! ```text
//! register(resource) ──► slots[id] = Pending         (insertion order kept)
//!
//! transition(id, state)
//!     ├─► per-id gate acquired                       (serializes one resource)
//!     ├─► validate against the lifecycle table
//!     ├─► mutate in-memory state, release map lock
//!     └─► publish(ResourceReady | ResourceStopped)   (gate still held)
//! ```
//!
//! ## Rules
//! - Transitions for a single id are serialized by a per-id async gate, so
//!   events for one resource reach the bus in transition order. Cross-resource
//!   transitions need no coordination and may interleave.
//! - The map lock is never held across `publish`; handlers may call
//!   [`ResourceRegistry::snapshot`] or [`ResourceRegistry::get`] freely.
//!   A handler must not call `transition` for the id it is handling.
//! - State is mutated before the envelope is published: no handler can observe
//!   a half-updated resource.
//! - State transitions are monotonic within a run; a restart
//!   (`Stopped → Starting`) begins a new lifecycle sequence for the same id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::error::RegistryError;
use crate::events::{Envelope, EventBus, EventKind};

/// Kind of managed unit a resource represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A container managed by the host orchestrator.
    Container,
    /// An executable / language process.
    Process,
    /// A logical component with an observable lifecycle but no OS footprint.
    Logical,
    /// A pure configuration value (parameter, connection string). Carries no
    /// observable lifecycle and is excluded from watching.
    Value,
}

impl ResourceKind {
    /// Whether resources of this kind go through the lifecycle state machine.
    ///
    /// `Value` resources exist only to be referenced by others; they never
    /// become `Ready` or `Stopped` and the notifier skips them.
    pub fn has_lifecycle(&self) -> bool {
        !matches!(self, ResourceKind::Value)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Container => "container",
            ResourceKind::Process => "process",
            ResourceKind::Logical => "logical",
            ResourceKind::Value => "value",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of a resource.
///
/// Legal edges: `Pending → Starting`, `Starting → Ready | Failed`,
/// `Ready → Stopped | Failed`, `Stopped → Starting`, `Failed → Starting`.
/// Restart from `Failed` is allowed (manual restart of a crashed resource).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Registered, not yet started.
    Pending,
    /// Startup in progress.
    Starting,
    /// Running and serving.
    Ready,
    /// Stopped gracefully; may restart.
    Stopped,
    /// Crashed or failed to start; may restart.
    Failed,
}

impl ResourceState {
    /// Whether `next` is a legal successor of `self` in the lifecycle table.
    pub fn allows(&self, next: ResourceState) -> bool {
        use ResourceState::*;
        matches!(
            (self, next),
            (Pending, Starting)
                | (Starting, Ready)
                | (Starting, Failed)
                | (Ready, Stopped)
                | (Ready, Failed)
                | (Stopped, Starting)
                | (Failed, Starting)
        )
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceState::Pending => "pending",
            ResourceState::Starting => "starting",
            ResourceState::Ready => "ready",
            ResourceState::Stopped => "stopped",
            ResourceState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A managed unit whose lifecycle is observable.
///
/// Owned exclusively by the registry; callers receive clones.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Unique id, stable for the process lifetime.
    pub id: Arc<str>,
    /// What kind of unit this is.
    pub kind: ResourceKind,
    /// Human-readable name used in notifications.
    pub display_name: String,
    /// Current lifecycle state.
    pub state: ResourceState,
}

impl Resource {
    /// Creates a new resource in the `Pending` state. The display name
    /// defaults to the id.
    pub fn new(id: impl Into<Arc<str>>, kind: ResourceKind) -> Self {
        let id = id.into();
        Self {
            display_name: id.to_string(),
            id,
            kind,
            state: ResourceState::Pending,
        }
    }

    /// Overrides the display name shown in notifications.
    #[inline]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }
}

/// Registry slot: the resource plus its transition gate.
struct Slot {
    resource: Resource,
    /// Serializes transition-and-publish for this id.
    gate: Arc<Mutex<()>>,
}

struct Inner {
    slots: HashMap<Arc<str>, Slot>,
    /// Ids in registration order, backing `snapshot()`.
    order: Vec<Arc<str>>,
}

/// Tracks the dynamic set of known resources and publishes their lifecycle
/// events on the bus.
pub struct ResourceRegistry {
    inner: RwLock<Inner>,
    bus: EventBus,
}

impl ResourceRegistry {
    /// Creates a new, empty registry publishing on the given bus.
    pub fn new(bus: EventBus) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Inner {
                slots: HashMap::new(),
                order: Vec::new(),
            }),
            bus,
        })
    }

    /// Registers a resource under its id.
    ///
    /// Fails with [`RegistryError::DuplicateId`] if the id is already in use.
    /// Registration itself publishes no event.
    pub async fn register(&self, resource: Resource) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        if inner.slots.contains_key(&resource.id) {
            return Err(RegistryError::DuplicateId {
                id: resource.id.to_string(),
            });
        }
        let id = Arc::clone(&resource.id);
        inner.order.push(Arc::clone(&id));
        inner.slots.insert(
            id,
            Slot {
                resource,
                gate: Arc::new(Mutex::new(())),
            },
        );
        Ok(())
    }

    /// Transitions a resource to `new_state`, publishing `ResourceReady` /
    /// `ResourceStopped` on the corresponding edges.
    ///
    /// Fails with [`RegistryError::UnknownResource`] if the id is absent and
    /// [`RegistryError::InvalidTransition`] if `new_state` does not follow the
    /// current state; in both cases registry state is unchanged and no event
    /// is published.
    ///
    /// The publish happens strictly after the in-memory mutation, while the
    /// per-id gate is still held, so concurrent callers observe per-resource
    /// events in transition order.
    pub async fn transition(
        &self,
        id: &str,
        new_state: ResourceState,
    ) -> Result<(), RegistryError> {
        let gate = {
            let inner = self.inner.read().await;
            let slot = inner
                .slots
                .get(id)
                .ok_or_else(|| RegistryError::UnknownResource { id: id.to_string() })?;
            Arc::clone(&slot.gate)
        };

        let _serialized = gate.lock().await;

        let resource_id = {
            let mut inner = self.inner.write().await;
            // The slot cannot disappear: the registry never removes entries.
            let slot = inner
                .slots
                .get_mut(id)
                .ok_or_else(|| RegistryError::UnknownResource { id: id.to_string() })?;
            let current = slot.resource.state;
            if !current.allows(new_state) {
                return Err(RegistryError::InvalidTransition {
                    id: id.to_string(),
                    from: current,
                    to: new_state,
                });
            }
            slot.resource.state = new_state;
            Arc::clone(&slot.resource.id)
        };

        match new_state {
            ResourceState::Ready => {
                self.bus
                    .publish(Envelope::new(EventKind::ResourceReady).for_resource(resource_id))
                    .await;
            }
            ResourceState::Stopped => {
                self.bus
                    .publish(Envelope::new(EventKind::ResourceStopped).for_resource(resource_id))
                    .await;
            }
            _ => {}
        }
        Ok(())
    }

    /// Returns all resources in registration order.
    pub async fn snapshot(&self) -> Vec<Resource> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.slots.get(id))
            .map(|slot| slot.resource.clone())
            .collect()
    }

    /// Returns a clone of the resource with the given id, if registered.
    pub async fn get(&self, id: &str) -> Option<Resource> {
        let inner = self.inner.read().await;
        inner.slots.get(id).map(|slot| slot.resource.clone())
    }

    /// Number of registered resources.
    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    /// True if nothing has been registered.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.order.is_empty()
    }
}

//! # lifevisor
//!
//! **Lifevisor** is a resource lifecycle event notifier for Rust.
//!
//! It provides a typed in-process event bus over a dynamic set of managed
//! resources, per-resource and global subscriptions, and best-effort delivery
//! of formatted notifications to an external webhook. The crate is designed as
//! a building block for orchestration hosts that want chat-visible lifecycle
//! reporting without coupling their startup or shutdown to it.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!    host / orchestrator
//!        │ register / transition
//!        ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  ResourceRegistry (single source of truth for resource state)    │
//! │  - insertion-ordered snapshot()                                  │
//! │  - per-id transition gate (serializes one resource)              │
//! │  - publishes ResourceReady / ResourceStopped after mutation      │
//! └──────────────────────────┬───────────────────────────────────────┘
//!                            ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  EventBus (typed pub/sub keyed by kind + optional resource id)   │
//! │  - synchronous per-handler delivery inside publish               │
//! │  - panic isolation + per-handler timeout                         │
//! └───────┬──────────────────────────────┬───────────────────────────┘
//!         ▼                              ▼
//!   global handlers               per-resource handlers
//!   (BeforeStart, Shutdown,       (ResourceReady / ResourceStopped)
//!    AfterResourcesCreated)                 │
//!         │                                 │
//!         └────────────► NotifierService ◄──┘
//!                          │  format (pure, per resource kind)
//!                          │  in-flight delivery semaphore
//!                          ▼
//!                    NotifySink (Discord webhook, 5s timeout, no retry)
//! ```
//!
//! ### Lifecycle
//! ```text
//! register(cache), register(web)          (resources start Pending)
//! publish(BeforeStart)
//!   ├─► "Starting 2 resources" notification
//!   └─► watch_all(): Ready/Stopped subscriptions per resource
//! publish(AfterResourcesCreated)
//!   └─► shutdown hook armed
//! transition(cache, Starting → Ready)     ─► "cache is ready"
//! transition(cache, Ready → Stopped)      ─► "cache stopped"
//! transition(cache, Stopped → … → Ready)  ─► "cache is ready" (restart)
//! signal / programmatic stop
//!   ├─► publish(Shutdown)
//!   └─► ShutdownHooks::drain() ─► "shutting down" (own timeout, detached)
//! ```
//!
//! ## Features
//! | Area              | Description                                                          | Key types / traits                      |
//! |-------------------|----------------------------------------------------------------------|-----------------------------------------|
//! | **Event bus**     | Typed pub/sub with global and per-resource subscriptions.            | [`EventBus`], [`Subscribe`], [`Envelope`] |
//! | **Registry**      | Resource identity, kinds, monotonic lifecycle state machine.         | [`ResourceRegistry`], [`Resource`]      |
//! | **Delivery**      | Best-effort webhook delivery with timeout and failure containment.   | [`NotifySink`], [`DiscordSink`]         |
//! | **Policy**        | Subscription wiring, formatting, startup/shutdown sequencing.        | [`NotifierService`]                     |
//! | **Shutdown**      | Explicit hook list drained with per-hook timeouts.                   | [`ShutdownHooks`], [`run_until_shutdown`] |
//! | **Errors**        | Typed errors for registry violations and delivery failures.          | [`RegistryError`], [`DeliveryError`]    |
//! | **Configuration** | Centralized settings; missing webhook URL = graceful no-op mode.     | [`NotifierConfig`]                      |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use lifevisor::{
//!     Envelope, EventBus, EventKind, NotifierConfig, NotifierService, Resource, ResourceKind,
//!     ResourceRegistry, ResourceState, ShutdownHooks,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = NotifierConfig::from_env(); // DISCORD_WEBHOOK_URL, absent = disabled
//!     let bus = EventBus::new(cfg.handler_timeout);
//!     let registry = ResourceRegistry::new(bus.clone());
//!     let hooks = Arc::new(ShutdownHooks::new());
//!
//!     registry.register(Resource::new("cache", ResourceKind::Container)).await?;
//!     registry.register(Resource::new("web", ResourceKind::Process)).await?;
//!
//!     let notifier = NotifierService::from_config(bus.clone(), Arc::clone(&registry), &cfg);
//!     notifier.notify_on_startup().await;
//!     notifier.watch_all().await;
//!     notifier.notify_on_shutdown(Arc::clone(&hooks)).await;
//!
//!     bus.publish(Envelope::new(EventKind::BeforeStart)).await;
//!     bus.publish(Envelope::new(EventKind::AfterResourcesCreated)).await;
//!
//!     registry.transition("cache", ResourceState::Starting).await?;
//!     registry.transition("cache", ResourceState::Ready).await?;
//!
//!     // ... on termination:
//!     bus.publish(Envelope::new(EventKind::Shutdown)).await;
//!     hooks.drain().await;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod events;
mod notifier;
mod registry;
mod shutdown;
mod sink;

// ---- Public re-exports ----

pub use config::{NotifierConfig, WEBHOOK_URL_ENV};
pub use error::{DeliveryError, RegistryError};
pub use events::{Envelope, EventBus, EventKind, Subscribe, SubscriptionHandle};
pub use notifier::{
    lifecycle_message, shutdown_message, startup_message, NotifierService, COLOR_READY,
    COLOR_SHUTDOWN, COLOR_STARTUP, COLOR_STOPPED,
};
pub use registry::{Resource, ResourceKind, ResourceRegistry, ResourceState};
pub use shutdown::{run_until_shutdown, wait_for_shutdown_signal, ShutdownHooks};
pub use sink::{DiscordSink, NotificationMessage, NotifySink};

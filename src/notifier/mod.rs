//! # Notifier service: the policy layer between the bus and the sink.
//!
//! [`NotifierService`] owns the subscriptions (global + per-resource), the
//! message formatting, and the startup/shutdown notification sequencing.
//!
//! ## Architecture
//! ```text
//! BeforeStart ──► StartupHandler ──────────► "Starting N resources"
//!             └─► WatchAllHandler ─► subscribe(Ready/Stopped, id) per resource
//!
//! ResourceReady / ResourceStopped ──► LifecycleHandler ──► format ──► sink
//!
//! AfterResourcesCreated ──► ArmShutdownHandler ──► ShutdownHooks::arm(...)
//!                                (hook delivers "shutting down" during drain)
//! ```
//!
//! ## Rules
//! - The notifier never watches its own resource id (self-exclusion) and
//!   skips kinds without an observable lifecycle.
//! - Resources registered after the `BeforeStart` snapshot are not
//!   auto-watched; use [`NotifierService::watch_one`] for late arrivals.
//! - Every delivery error is contained to that single notification: logged as
//!   a warning, never retried, never escalated.
//! - Without a configured webhook URL the service constructs in disabled mode
//!   and performs zero network calls for the entire run.

mod format;

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

use crate::config::NotifierConfig;
use crate::events::{Envelope, EventBus, EventKind, Subscribe};
use crate::registry::{Resource, ResourceRegistry};
use crate::shutdown::ShutdownHooks;
use crate::sink::{NotificationMessage, NotifySink};

pub use format::{
    lifecycle_message, shutdown_message, startup_message, COLOR_READY, COLOR_SHUTDOWN,
    COLOR_STARTUP, COLOR_STOPPED,
};

/// Shared state behind every handler the service registers.
struct NotifierCore {
    registry: Arc<ResourceRegistry>,
    sink: Option<Arc<dyn NotifySink>>,
    /// Bounds concurrent in-flight sink deliveries. `None` = unlimited.
    limiter: Option<Semaphore>,
    self_id: Arc<str>,
    watched: Mutex<Vec<Arc<str>>>,
    armed: AtomicBool,
}

impl NotifierCore {
    /// Whether this resource belongs in the watched set.
    fn watchable(&self, resource: &Resource) -> bool {
        resource.kind.has_lifecycle() && resource.id != self.self_id
    }

    /// Subscribes the Ready/Stopped pair for one id, deduplicating repeats.
    async fn watch_id(core: &Arc<Self>, bus: &EventBus, id: &Arc<str>) {
        {
            let mut watched = core.watched.lock().await;
            if watched.iter().any(|w| w == id) {
                return;
            }
            watched.push(Arc::clone(id));
        }
        let handler: Arc<dyn Subscribe> = Arc::new(LifecycleHandler {
            core: Arc::clone(core),
        });
        bus.subscribe(EventKind::ResourceReady, Some(id), Arc::clone(&handler))
            .await;
        bus.subscribe(EventKind::ResourceStopped, Some(id), handler)
            .await;
        debug!(resource = %id, "watching resource lifecycle");
    }

    /// Delivers one message, containing any failure to this notification.
    async fn deliver(&self, message: NotificationMessage) {
        let Some(sink) = &self.sink else {
            return;
        };
        let _permit = match &self.limiter {
            Some(sem) => sem.acquire().await.ok(),
            None => None,
        };
        if let Err(err) = sink.deliver(&message).await {
            warn!(
                sink = sink.name(),
                label = err.as_label(),
                title = %message.title,
                "notification delivery failed: {err}"
            );
        }
    }
}

/// Binds the event bus to the notification sink.
///
/// Constructed once per run with an explicit bus handle; there is no ambient
/// registration. All `watch_*`/`notify_*` methods register static
/// subscriptions and return; the work happens when events fire.
pub struct NotifierService {
    bus: EventBus,
    core: Arc<NotifierCore>,
    shutdown_grace: Duration,
}

impl NotifierService {
    /// Creates a service delivering through `sink`.
    ///
    /// `sink = None` is the deliberate degrade-gracefully path: the service
    /// logs one warning and every subsequent call becomes a no-op.
    pub fn new(
        bus: EventBus,
        registry: Arc<ResourceRegistry>,
        sink: Option<Arc<dyn NotifySink>>,
        cfg: &NotifierConfig,
    ) -> Self {
        if sink.is_none() {
            warn!("webhook URL not configured; lifecycle notifications disabled");
        }
        Self {
            bus,
            core: Arc::new(NotifierCore {
                registry,
                sink,
                limiter: cfg.inflight_limit().map(Semaphore::new),
                self_id: Arc::from(cfg.self_id.as_str()),
                watched: Mutex::new(Vec::new()),
                armed: AtomicBool::new(false),
            }),
            shutdown_grace: cfg.shutdown_grace,
        }
    }

    /// Creates a service with the built-in Discord sink when the config
    /// carries a webhook URL, and in disabled mode otherwise.
    pub fn from_config(
        bus: EventBus,
        registry: Arc<ResourceRegistry>,
        cfg: &NotifierConfig,
    ) -> Self {
        let sink: Option<Arc<dyn NotifySink>> = match &cfg.webhook_url {
            Some(url) => {
                match crate::sink::DiscordSink::new(url.clone(), cfg.delivery_timeout) {
                    Ok(sink) => Some(Arc::new(sink.with_footer(
                        cfg.footer_text.clone(),
                        cfg.footer_icon_url.clone(),
                    ))),
                    Err(err) => {
                        warn!(
                            label = err.as_label(),
                            "failed to construct webhook sink; notifications disabled: {err}"
                        );
                        None
                    }
                }
            }
            None => None,
        };
        Self::new(bus, registry, sink, cfg)
    }

    /// True when a sink is configured.
    pub fn is_enabled(&self) -> bool {
        self.core.sink.is_some()
    }

    /// Arms per-resource watching for everything present when `BeforeStart`
    /// fires.
    ///
    /// The registry is enumerated at fire time; the notifier's own id and
    /// kinds without an observable lifecycle are excluded. Resources
    /// registered after that snapshot are not auto-watched.
    pub async fn watch_all(&self) {
        if !self.is_enabled() {
            debug!("watch_all skipped: notifier disabled");
            return;
        }
        self.bus
            .subscribe(
                EventKind::BeforeStart,
                None,
                Arc::new(WatchAllHandler {
                    core: Arc::clone(&self.core),
                    bus: self.bus.clone(),
                }),
            )
            .await;
    }

    /// Watches a single explicit id, independently of [`watch_all`].
    ///
    /// [`watch_all`]: NotifierService::watch_all
    pub async fn watch_one(&self, id: &str) {
        if !self.is_enabled() {
            debug!("watch_one skipped: notifier disabled");
            return;
        }
        NotifierCore::watch_id(&self.core, &self.bus, &Arc::from(id)).await;
    }

    /// Registers the global handler that delivers the single
    /// "starting, N resources" message when `BeforeStart` fires.
    pub async fn notify_on_startup(&self) {
        if !self.is_enabled() {
            debug!("notify_on_startup skipped: notifier disabled");
            return;
        }
        self.bus
            .subscribe(
                EventKind::BeforeStart,
                None,
                Arc::new(StartupHandler {
                    core: Arc::clone(&self.core),
                }),
            )
            .await;
    }

    /// Registers the global handler that arms the shutdown-notification hook
    /// when `AfterResourcesCreated` fires.
    ///
    /// The hook itself runs during [`ShutdownHooks::drain`], detached from the
    /// cancelled lifecycle context and bounded by the configured grace; its
    /// delivery is best-effort and swallows all errors.
    pub async fn notify_on_shutdown(&self, hooks: Arc<ShutdownHooks>) {
        if !self.is_enabled() {
            debug!("notify_on_shutdown skipped: notifier disabled");
            return;
        }
        self.bus
            .subscribe(
                EventKind::AfterResourcesCreated,
                None,
                Arc::new(ArmShutdownHandler {
                    core: Arc::clone(&self.core),
                    hooks,
                    grace: self.shutdown_grace,
                }),
            )
            .await;
    }

    /// Ids currently in the watched set, in watch order.
    pub async fn watched(&self) -> Vec<Arc<str>> {
        self.core.watched.lock().await.clone()
    }
}

/// Global `BeforeStart` handler: one "starting" summary per run.
struct StartupHandler {
    core: Arc<NotifierCore>,
}

#[async_trait]
impl Subscribe for StartupHandler {
    async fn on_event(&self, ev: &Envelope) {
        let count = self
            .core
            .registry
            .snapshot()
            .await
            .iter()
            .filter(|r| self.core.watchable(r))
            .count();
        self.core.deliver(startup_message(count, ev.at)).await;
    }

    fn name(&self) -> &'static str {
        "startup_notifier"
    }
}

/// Global `BeforeStart` handler: snapshots the registry and arms per-resource
/// watches.
struct WatchAllHandler {
    core: Arc<NotifierCore>,
    bus: EventBus,
}

#[async_trait]
impl Subscribe for WatchAllHandler {
    async fn on_event(&self, _ev: &Envelope) {
        for resource in self.core.registry.snapshot().await {
            if self.core.watchable(&resource) {
                NotifierCore::watch_id(&self.core, &self.bus, &resource.id).await;
            }
        }
    }

    fn name(&self) -> &'static str {
        "watch_all"
    }
}

/// Per-resource handler for Ready/Stopped events.
struct LifecycleHandler {
    core: Arc<NotifierCore>,
}

#[async_trait]
impl Subscribe for LifecycleHandler {
    async fn on_event(&self, ev: &Envelope) {
        let Some(id) = &ev.resource else {
            return;
        };
        let Some(resource) = self.core.registry.get(id).await else {
            warn!(resource = %id, "lifecycle event for unregistered resource; skipped");
            return;
        };
        if let Some(msg) = lifecycle_message(&resource, ev.kind, ev.at) {
            self.core.deliver(msg).await;
        }
    }

    fn name(&self) -> &'static str {
        "lifecycle_notifier"
    }
}

/// Global `AfterResourcesCreated` handler: arms the shutdown hook exactly once.
struct ArmShutdownHandler {
    core: Arc<NotifierCore>,
    hooks: Arc<ShutdownHooks>,
    grace: Duration,
}

#[async_trait]
impl Subscribe for ArmShutdownHandler {
    async fn on_event(&self, _ev: &Envelope) {
        if self.core.armed.swap(true, AtomicOrdering::SeqCst) {
            return;
        }
        let core = Arc::clone(&self.core);
        self.hooks
            .arm("shutdown_notification", self.grace, async move {
                core.deliver(shutdown_message(SystemTime::now())).await;
            })
            .await;
    }

    fn name(&self) -> &'static str {
        "arm_shutdown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use crate::registry::ResourceKind;
    use std::sync::Mutex as StdMutex;

    struct RecordingSink {
        seen: StdMutex<Vec<NotificationMessage>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: StdMutex::new(Vec::new()),
            })
        }

        fn titles(&self) -> Vec<String> {
            self.seen.lock().unwrap().iter().map(|m| m.title.clone()).collect()
        }
    }

    #[async_trait]
    impl NotifySink for RecordingSink {
        async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
            self.seen.lock().unwrap().push(message.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    fn setup(
        sink: Option<Arc<dyn NotifySink>>,
    ) -> (EventBus, Arc<ResourceRegistry>, NotifierService) {
        let cfg = NotifierConfig::default();
        let bus = EventBus::new(cfg.handler_timeout);
        let registry = ResourceRegistry::new(bus.clone());
        let svc = NotifierService::new(bus.clone(), Arc::clone(&registry), sink, &cfg);
        (bus, registry, svc)
    }

    #[tokio::test]
    async fn test_watch_all_excludes_self_and_values() {
        let sink = RecordingSink::new();
        let (bus, registry, svc) = setup(Some(sink.clone()));

        registry
            .register(Resource::new("lifecycle-notifier", ResourceKind::Logical))
            .await
            .unwrap();
        registry
            .register(Resource::new("cache", ResourceKind::Container))
            .await
            .unwrap();
        registry
            .register(Resource::new("conn-string", ResourceKind::Value))
            .await
            .unwrap();

        svc.watch_all().await;
        bus.publish(Envelope::new(EventKind::BeforeStart)).await;

        let watched = svc.watched().await;
        assert_eq!(watched.len(), 1);
        assert_eq!(&*watched[0], "cache");
    }

    #[tokio::test]
    async fn test_watch_one_is_deduplicated() {
        let sink = RecordingSink::new();
        let (_bus, registry, svc) = setup(Some(sink.clone()));
        registry
            .register(Resource::new("web", ResourceKind::Process))
            .await
            .unwrap();

        svc.watch_one("web").await;
        svc.watch_one("web").await;
        assert_eq!(svc.watched().await.len(), 1);

        use crate::registry::ResourceState;
        registry.transition("web", ResourceState::Starting).await.unwrap();
        registry.transition("web", ResourceState::Ready).await.unwrap();
        assert_eq!(sink.titles().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_service_registers_nothing() {
        let (bus, registry, svc) = setup(None);
        registry
            .register(Resource::new("cache", ResourceKind::Container))
            .await
            .unwrap();

        assert!(!svc.is_enabled());
        svc.notify_on_startup().await;
        svc.watch_all().await;
        svc.watch_one("cache").await;
        svc.notify_on_shutdown(Arc::new(ShutdownHooks::new())).await;

        assert_eq!(bus.subscription_count().await, 0);
        bus.publish(Envelope::new(EventKind::BeforeStart)).await;
        assert!(svc.watched().await.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_hook_armed_once() {
        let sink = RecordingSink::new();
        let (bus, _registry, svc) = setup(Some(sink.clone()));
        let hooks = Arc::new(ShutdownHooks::new());

        svc.notify_on_shutdown(Arc::clone(&hooks)).await;
        bus.publish(Envelope::new(EventKind::AfterResourcesCreated))
            .await;
        bus.publish(Envelope::new(EventKind::AfterResourcesCreated))
            .await;

        assert_eq!(hooks.len().await, 1);
        hooks.drain().await;
        let titles = sink.titles();
        assert_eq!(titles.len(), 1);
        assert!(titles[0].contains("shutting down"));
    }
}

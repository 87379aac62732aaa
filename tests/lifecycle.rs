//! End-to-end lifecycle runs: registry → bus → notifier → sink.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use lifevisor::{
    run_until_shutdown, DeliveryError, Envelope, EventBus, EventKind, NotificationMessage,
    NotifierConfig, NotifierService, NotifySink, RegistryError, Resource, ResourceKind,
    ResourceRegistry, ResourceState, ShutdownHooks, COLOR_READY, COLOR_STOPPED,
};

/// Sink that records every message it is asked to deliver.
struct RecordingSink {
    seen: Mutex<Vec<NotificationMessage>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    fn messages(&self) -> Vec<NotificationMessage> {
        self.seen.lock().unwrap().clone()
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

/// Sink that counts attempts and always fails with a network error.
struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl NotifySink for FailingSink {
    async fn deliver(&self, _message: &NotificationMessage) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DeliveryError::Network {
            message: "connection refused".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Sink that fails on the first delivery and records the rest.
struct FlakySink {
    calls: AtomicUsize,
    delivered: Mutex<Vec<String>>,
}

impl FlakySink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl NotifySink for FlakySink {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(DeliveryError::Http { status: 500 });
        }
        self.delivered.lock().unwrap().push(message.title.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

fn setup(sink: Option<Arc<dyn NotifySink>>) -> (EventBus, Arc<ResourceRegistry>, NotifierService) {
    let cfg = NotifierConfig::default();
    let bus = EventBus::new(cfg.handler_timeout);
    let registry = ResourceRegistry::new(bus.clone());
    let svc = NotifierService::new(bus.clone(), Arc::clone(&registry), sink, &cfg);
    (bus, registry, svc)
}

#[tokio::test]
async fn test_startup_summary_and_watch_set() {
    let sink = RecordingSink::new();
    let (bus, registry, svc) = setup(Some(sink.clone()));

    registry
        .register(Resource::new("cache", ResourceKind::Container))
        .await
        .unwrap();
    registry
        .register(Resource::new("web", ResourceKind::Process))
        .await
        .unwrap();

    svc.notify_on_startup().await;
    svc.watch_all().await;
    bus.publish(Envelope::new(EventKind::BeforeStart)).await;

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].body.contains("2 resources"));

    let watched: Vec<String> = svc.watched().await.iter().map(|id| id.to_string()).collect();
    assert_eq!(watched, vec!["cache", "web"]);
}

#[tokio::test]
async fn test_restart_cycle_notifies_each_ready() {
    let sink = RecordingSink::new();
    let (bus, registry, svc) = setup(Some(sink.clone()));

    registry
        .register(Resource::new("cache", ResourceKind::Container))
        .await
        .unwrap();
    svc.watch_all().await;
    bus.publish(Envelope::new(EventKind::BeforeStart)).await;

    registry
        .transition("cache", ResourceState::Starting)
        .await
        .unwrap();
    registry
        .transition("cache", ResourceState::Ready)
        .await
        .unwrap();

    let after_first = sink.messages();
    assert_eq!(after_first.len(), 1);
    assert!(after_first[0].title.contains("cache"));
    assert_eq!(after_first[0].color, COLOR_READY);

    registry
        .transition("cache", ResourceState::Stopped)
        .await
        .unwrap();
    registry
        .transition("cache", ResourceState::Starting)
        .await
        .unwrap();
    registry
        .transition("cache", ResourceState::Ready)
        .await
        .unwrap();

    let messages = sink.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].color, COLOR_STOPPED);
    let ready_count = messages.iter().filter(|m| m.color == COLOR_READY).count();
    assert_eq!(ready_count, 2);
}

#[tokio::test]
async fn test_failing_sink_never_crashes_full_run() {
    let sink = FailingSink::new();
    let (bus, registry, svc) = setup(Some(sink.clone()));
    let hooks = Arc::new(ShutdownHooks::new());

    for id in ["cache", "web", "api"] {
        registry
            .register(Resource::new(id, ResourceKind::Container))
            .await
            .unwrap();
    }

    svc.notify_on_startup().await;
    svc.watch_all().await;
    svc.notify_on_shutdown(Arc::clone(&hooks)).await;

    bus.publish(Envelope::new(EventKind::BeforeStart)).await;
    bus.publish(Envelope::new(EventKind::AfterResourcesCreated))
        .await;

    for id in ["cache", "web", "api"] {
        registry
            .transition(id, ResourceState::Starting)
            .await
            .unwrap();
        registry.transition(id, ResourceState::Ready).await.unwrap();
    }

    let stop = CancellationToken::new();
    stop.cancel();
    run_until_shutdown(&bus, &hooks, stop).await.unwrap();

    // 1 startup + 3 ready + 1 shutdown, all attempted and all failed.
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_one_failed_delivery_does_not_block_the_next() {
    let sink = FlakySink::new();
    let (bus, registry, svc) = setup(Some(sink.clone()));

    registry
        .register(Resource::new("cache", ResourceKind::Container))
        .await
        .unwrap();
    registry
        .register(Resource::new("web", ResourceKind::Process))
        .await
        .unwrap();
    svc.watch_all().await;
    bus.publish(Envelope::new(EventKind::BeforeStart)).await;

    for id in ["cache", "web"] {
        registry
            .transition(id, ResourceState::Starting)
            .await
            .unwrap();
        registry.transition(id, ResourceState::Ready).await.unwrap();
    }

    assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    let delivered = sink.delivered.lock().unwrap().clone();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].contains("web"));
}

#[tokio::test]
async fn test_self_exclusion_yields_zero_self_notifications() {
    let sink = RecordingSink::new();
    let (bus, registry, svc) = setup(Some(sink.clone()));

    registry
        .register(Resource::new("lifecycle-notifier", ResourceKind::Logical))
        .await
        .unwrap();
    registry
        .register(Resource::new("web", ResourceKind::Process))
        .await
        .unwrap();

    svc.notify_on_startup().await;
    svc.watch_all().await;
    bus.publish(Envelope::new(EventKind::BeforeStart)).await;

    for id in ["lifecycle-notifier", "web"] {
        registry
            .transition(id, ResourceState::Starting)
            .await
            .unwrap();
        registry.transition(id, ResourceState::Ready).await.unwrap();
    }

    let messages = sink.messages();
    // One startup summary (counting only "web") and one ready for "web".
    assert_eq!(messages.len(), 2);
    assert!(messages[0].body.contains("1 resource"));
    assert!(messages
        .iter()
        .all(|m| !m.title.contains("lifecycle-notifier")));
}

#[tokio::test]
async fn test_missing_webhook_url_disables_everything() {
    let cfg = NotifierConfig::default(); // webhook_url = None
    let bus = EventBus::new(cfg.handler_timeout);
    let registry = ResourceRegistry::new(bus.clone());
    let svc = NotifierService::from_config(bus.clone(), Arc::clone(&registry), &cfg);
    let hooks = Arc::new(ShutdownHooks::new());

    registry
        .register(Resource::new("cache", ResourceKind::Container))
        .await
        .unwrap();

    assert!(!svc.is_enabled());
    svc.notify_on_startup().await;
    svc.watch_all().await;
    svc.notify_on_shutdown(Arc::clone(&hooks)).await;

    bus.publish(Envelope::new(EventKind::BeforeStart)).await;
    bus.publish(Envelope::new(EventKind::AfterResourcesCreated))
        .await;
    registry
        .transition("cache", ResourceState::Starting)
        .await
        .unwrap();
    registry
        .transition("cache", ResourceState::Ready)
        .await
        .unwrap();

    assert_eq!(bus.subscription_count().await, 0);
    assert!(hooks.is_empty().await);
    assert!(svc.watched().await.is_empty());
}

#[tokio::test]
async fn test_ghost_transition_is_rejected_without_side_effects() {
    let sink = RecordingSink::new();
    let (bus, registry, svc) = setup(Some(sink.clone()));

    registry
        .register(Resource::new("web", ResourceKind::Process))
        .await
        .unwrap();
    svc.watch_all().await;
    bus.publish(Envelope::new(EventKind::BeforeStart)).await;

    let err = registry
        .transition("ghost", ResourceState::Ready)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::UnknownResource { .. }));

    let snapshot = registry.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(&*snapshot[0].id, "web");
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn test_late_registration_is_not_auto_watched() {
    let sink = RecordingSink::new();
    let (bus, registry, svc) = setup(Some(sink.clone()));

    registry
        .register(Resource::new("web", ResourceKind::Process))
        .await
        .unwrap();
    svc.watch_all().await;
    bus.publish(Envelope::new(EventKind::BeforeStart)).await;

    // Registered after the BeforeStart snapshot: not watched automatically.
    registry
        .register(Resource::new("late", ResourceKind::Container))
        .await
        .unwrap();
    registry
        .transition("late", ResourceState::Starting)
        .await
        .unwrap();
    registry
        .transition("late", ResourceState::Ready)
        .await
        .unwrap();
    assert!(sink.messages().is_empty());

    // watch_one picks it up explicitly.
    svc.watch_one("late").await;
    registry
        .transition("late", ResourceState::Stopped)
        .await
        .unwrap();
    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].title.contains("late"));
}

//! # Demo: console_run
//!
//! Full lifecycle run against a console sink (no network, no secrets).
//!
//! Shows how to:
//! - Implement the [`NotifySink`] trait.
//! - Wire [`NotifierService`] subscriptions before firing `BeforeStart`.
//! - Drive the staged lifecycle and the shutdown-hook drain.
//!
//! ## Run
//! ```bash
//! cargo run --example console_run
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use lifevisor::{
    run_until_shutdown, DeliveryError, Envelope, EventBus, EventKind, NotificationMessage,
    NotifierConfig, NotifierService, NotifySink, Resource, ResourceKind, ResourceRegistry,
    ResourceState, ShutdownHooks,
};

/// A sink that prints instead of posting. In real life this is the webhook.
struct ConsoleSink;

#[async_trait]
impl NotifySink for ConsoleSink {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        println!("[notify] {} — {}", message.title, message.body);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = NotifierConfig::default();
    let bus = EventBus::new(cfg.handler_timeout);
    let registry = ResourceRegistry::new(bus.clone());
    let hooks = Arc::new(ShutdownHooks::new());

    registry
        .register(Resource::new("shared-cache", ResourceKind::Container).with_display_name("Redis"))
        .await?;
    registry
        .register(Resource::new("python-api", ResourceKind::Process))
        .await?;
    registry
        .register(Resource::new("discord-webhook-url", ResourceKind::Value))
        .await?;

    let notifier = NotifierService::new(
        bus.clone(),
        Arc::clone(&registry),
        Some(Arc::new(ConsoleSink)),
        &cfg,
    );
    notifier.notify_on_startup().await;
    notifier.watch_all().await;
    notifier.notify_on_shutdown(Arc::clone(&hooks)).await;

    bus.publish(Envelope::new(EventKind::BeforeStart)).await;
    bus.publish(Envelope::new(EventKind::AfterResourcesCreated))
        .await;

    // Staged lifecycle: everything starts, the cache restarts once.
    for id in ["shared-cache", "python-api"] {
        registry.transition(id, ResourceState::Starting).await?;
        registry.transition(id, ResourceState::Ready).await?;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    registry
        .transition("shared-cache", ResourceState::Stopped)
        .await?;
    registry
        .transition("shared-cache", ResourceState::Starting)
        .await?;
    registry
        .transition("shared-cache", ResourceState::Ready)
        .await?;

    // End the run without waiting for a real signal.
    let stop = CancellationToken::new();
    stop.cancel();
    run_until_shutdown(&bus, &hooks, stop).await?;
    Ok(())
}

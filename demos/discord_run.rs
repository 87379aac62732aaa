//! # Demo: discord_run
//!
//! Posts real lifecycle notifications to a Discord webhook, then waits for
//! Ctrl-C and delivers the shutdown message during the hook drain.
//!
//! ## Run
//! ```bash
//! DISCORD_WEBHOOK_URL="https://discord.com/api/webhooks/..." \
//!     cargo run --example discord_run
//! ```
//!
//! Without the env var the notifier runs in disabled mode and the demo exits
//! after printing a hint.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use lifevisor::{
    run_until_shutdown, Envelope, EventBus, EventKind, NotifierConfig, NotifierService, Resource,
    ResourceKind, ResourceRegistry, ResourceState, ShutdownHooks, WEBHOOK_URL_ENV,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = NotifierConfig::from_env();
    let bus = EventBus::new(cfg.handler_timeout);
    let registry = ResourceRegistry::new(bus.clone());
    let hooks = Arc::new(ShutdownHooks::new());

    registry
        .register(Resource::new("shared-cache", ResourceKind::Container).with_display_name("Redis"))
        .await?;
    registry
        .register(Resource::new("python-api", ResourceKind::Process).with_display_name("Flask API"))
        .await?;
    registry
        .register(Resource::new("java-api", ResourceKind::Process).with_display_name("Spring API"))
        .await?;

    let notifier = NotifierService::from_config(bus.clone(), Arc::clone(&registry), &cfg);
    if !notifier.is_enabled() {
        eprintln!("set {WEBHOOK_URL_ENV} to run this demo against a real webhook");
        return Ok(());
    }
    notifier.notify_on_startup().await;
    notifier.watch_all().await;
    notifier.notify_on_shutdown(Arc::clone(&hooks)).await;

    bus.publish(Envelope::new(EventKind::BeforeStart)).await;
    bus.publish(Envelope::new(EventKind::AfterResourcesCreated))
        .await;

    for id in ["shared-cache", "python-api", "java-api"] {
        registry.transition(id, ResourceState::Starting).await?;
        tokio::time::sleep(Duration::from_millis(300)).await;
        registry.transition(id, ResourceState::Ready).await?;
    }

    println!("resources ready; Ctrl-C to shut down");
    run_until_shutdown(&bus, &hooks, CancellationToken::new()).await?;
    Ok(())
}

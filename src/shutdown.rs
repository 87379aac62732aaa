//! # Shutdown plumbing: signal handling and the shutdown-hook list.
//!
//! Two concerns live here:
//!
//! - [`wait_for_shutdown_signal`]: a cross-platform async helper that
//!   completes when the process receives a termination signal
//!   (SIGINT/SIGTERM/SIGQUIT on Unix, Ctrl-C elsewhere).
//! - [`ShutdownHooks`]: an explicit list of one-shot hooks drained by the
//!   host's termination sequence. Each hook runs in a detached context with
//!   its own bounded timeout — deliberately independent of the lifecycle
//!   cancellation that has already begun by the time hooks fire.
//!
//! [`run_until_shutdown`] ties them together for hosts that want the default
//! sequencing: wait for the signal (or a programmatic stop), publish the
//! global `Shutdown` envelope, drain the hooks.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::{Envelope, EventBus, EventKind};

/// One armed hook: a named one-shot future with its own time budget.
struct Hook {
    name: &'static str,
    timeout: Duration,
    fut: BoxFuture<'static, ()>,
}

/// Explicit list of shutdown hooks, drained once by the host.
///
/// Hooks run sequentially in arming order. A hook that exceeds its timeout is
/// abandoned and logged; draining itself never fails.
#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Mutex<Vec<Hook>>,
}

impl ShutdownHooks {
    /// Creates an empty hook list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a hook to run during drain, bounded by `timeout`.
    pub async fn arm(
        &self,
        name: &'static str,
        timeout: Duration,
        fut: impl std::future::Future<Output = ()> + Send + 'static,
    ) {
        let mut hooks = self.hooks.lock().await;
        hooks.push(Hook {
            name,
            timeout,
            fut: fut.boxed(),
        });
    }

    /// Number of armed hooks.
    pub async fn len(&self) -> usize {
        self.hooks.lock().await.len()
    }

    /// True if no hooks are armed.
    pub async fn is_empty(&self) -> bool {
        self.hooks.lock().await.is_empty()
    }

    /// Runs every armed hook once, each under its own timeout.
    ///
    /// Hooks armed after a drain has taken the list are not run by that drain.
    pub async fn drain(&self) {
        let hooks: Vec<Hook> = {
            let mut guard = self.hooks.lock().await;
            guard.drain(..).collect()
        };
        for hook in hooks {
            debug!(hook = hook.name, "running shutdown hook");
            if tokio::time::timeout(hook.timeout, hook.fut).await.is_err() {
                warn!(
                    hook = hook.name,
                    timeout = ?hook.timeout,
                    "shutdown hook exceeded its timeout; abandoned"
                );
            }
        }
    }
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Drives the default host termination sequence.
///
/// Waits until a termination signal arrives or `stop` is cancelled
/// (programmatic shutdown, useful in tests and demos), then publishes the
/// global [`EventKind::Shutdown`] envelope and drains the hooks.
pub async fn run_until_shutdown(
    bus: &EventBus,
    hooks: &ShutdownHooks,
    stop: CancellationToken,
) -> std::io::Result<()> {
    tokio::select! {
        res = wait_for_shutdown_signal() => res?,
        _ = stop.cancelled() => {},
    }
    bus.publish(Envelope::new(EventKind::Shutdown)).await;
    hooks.drain().await;
    Ok(())
}

//! # Notifier configuration.
//!
//! Provides [`NotifierConfig`], the centralized settings for the notifier
//! runtime. The only required secret is the webhook URL; its absence is not an
//! error but a deliberate degrade-gracefully path: the notifier constructs in
//! disabled mode, performs zero network calls, and leaves the host unaffected.
//!
//! ## Sentinel values
//! - `max_inflight = 0` → unlimited (no delivery semaphore created)

use std::time::Duration;

/// Environment variable holding the webhook URL secret.
pub const WEBHOOK_URL_ENV: &str = "DISCORD_WEBHOOK_URL";

/// Configuration for the notifier runtime.
///
/// ## Field semantics
/// - `webhook_url`: the single required secret; `None` disables the notifier
/// - `delivery_timeout`: HTTP request timeout for one sink call
/// - `handler_timeout`: bound on one event-handler invocation on the bus
/// - `shutdown_grace`: bound on the shutdown-notification hook
/// - `max_inflight`: cap on concurrent in-flight sink deliveries (`0` = unlimited)
/// - `self_id`: the notifier's own resource id, excluded from watching
#[derive(Clone, Debug)]
pub struct NotifierConfig {
    /// Webhook URL to deliver to. `None` puts the notifier in disabled mode.
    pub webhook_url: Option<String>,

    /// Maximum time for a single sink delivery. On expiry the delivery fails
    /// with a timeout error and is logged, not retried.
    pub delivery_timeout: Duration,

    /// Maximum time a single event handler may run inside `publish`.
    pub handler_timeout: Duration,

    /// Maximum time granted to the shutdown-notification hook during drain.
    ///
    /// The hook runs in a detached, non-cancelable context after the host's
    /// own cancellation has begun; this bound is all that limits it.
    pub shutdown_grace: Duration,

    /// Cap on concurrent in-flight sink deliveries.
    ///
    /// - `0` = unlimited (no semaphore)
    /// - `n > 0` = at most `n` simultaneous deliveries
    pub max_inflight: usize,

    /// The notifier's own resource id. Per-resource watching always excludes
    /// this id so the notifier never reports on itself.
    pub self_id: String,

    /// Footer text stamped on every embed.
    pub footer_text: String,

    /// Optional footer icon URL.
    pub footer_icon_url: Option<String>,
}

impl NotifierConfig {
    /// Reads the webhook URL from [`WEBHOOK_URL_ENV`], keeping every other
    /// field at its default. An empty value counts as absent.
    pub fn from_env() -> Self {
        Self {
            webhook_url: std::env::var(WEBHOOK_URL_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Returns the in-flight delivery cap as an `Option`.
    ///
    /// - `None` → unlimited (no semaphore)
    /// - `Some(n)` → at most `n` concurrent deliveries
    #[inline]
    pub fn inflight_limit(&self) -> Option<usize> {
        if self.max_inflight == 0 {
            None
        } else {
            Some(self.max_inflight)
        }
    }
}

impl Default for NotifierConfig {
    /// Default configuration:
    ///
    /// - `webhook_url = None` (disabled until configured)
    /// - `delivery_timeout = 5s`
    /// - `handler_timeout = 5s`
    /// - `shutdown_grace = 5s`
    /// - `max_inflight = 4`
    /// - `self_id = "lifecycle-notifier"`
    fn default() -> Self {
        Self {
            webhook_url: None,
            delivery_timeout: Duration::from_secs(5),
            handler_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(5),
            max_inflight: 4,
            self_id: "lifecycle-notifier".to_string(),
            footer_text: "lifevisor".to_string(),
            footer_icon_url: None,
        }
    }
}

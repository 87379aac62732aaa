//! # Discord webhook sink.
//!
//! Posts a single-embed JSON payload to a Discord webhook URL:
//!
//! ```json
//! { "embeds": [{ "title": "...", "description": "...", "color": 5763719,
//!                "timestamp": "2026-08-26T12:00:00Z",
//!                "footer": { "text": "...", "icon_url": "..." } }] }
//! ```
//!
//! The HTTP client carries the configured request timeout; a non-2xx response
//! or transport failure surfaces as a [`DeliveryError`] for the caller to log
//! and discard. There are no retries here.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DeliveryError;

use super::{NotificationMessage, NotifySink};

#[derive(Serialize)]
struct WebhookPayload<'a> {
    embeds: [Embed<'a>; 1],
}

#[derive(Serialize)]
struct Embed<'a> {
    title: &'a str,
    description: &'a str,
    color: u32,
    /// ISO-8601 timestamp rendered by Discord in the viewer's locale.
    timestamp: String,
    footer: Footer<'a>,
}

#[derive(Serialize)]
struct Footer<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_url: Option<&'a str>,
}

/// Stateless Discord webhook client.
pub struct DiscordSink {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    footer_text: String,
    footer_icon_url: Option<String>,
}

impl DiscordSink {
    /// Creates a sink posting to `url` with the given request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Network {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
            footer_text: "lifevisor".to_string(),
            footer_icon_url: None,
        })
    }

    /// Overrides the embed footer text.
    pub fn with_footer(mut self, text: impl Into<String>, icon_url: Option<String>) -> Self {
        self.footer_text = text.into();
        self.footer_icon_url = icon_url;
        self
    }

    fn payload<'a>(&'a self, message: &'a NotificationMessage) -> WebhookPayload<'a> {
        WebhookPayload {
            embeds: [Embed {
                title: &message.title,
                description: &message.body,
                color: message.color,
                timestamp: message.at.to_rfc3339(),
                footer: Footer {
                    text: &self.footer_text,
                    icon_url: self.footer_icon_url.as_deref(),
                },
            }],
        }
    }
}

#[async_trait]
impl NotifySink for DiscordSink {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout {
                        timeout: self.timeout,
                    }
                } else {
                    DeliveryError::Network {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Http {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message() -> NotificationMessage {
        NotificationMessage {
            title: "📦 cache is ready".to_string(),
            body: "Container 'cache' is now ready.".to_string(),
            color: 0x57F287,
            at: chrono::Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_payload_shape_matches_discord_contract() {
        let sink = DiscordSink::new("https://discord.invalid/api/webhooks/x", Duration::from_secs(5))
            .unwrap()
            .with_footer("demo", Some("https://example.com/icon.png".to_string()));

        let value = serde_json::to_value(sink.payload(&message())).unwrap();
        let embed = &value["embeds"][0];
        assert_eq!(embed["title"], "📦 cache is ready");
        assert_eq!(embed["description"], "Container 'cache' is now ready.");
        assert_eq!(embed["color"], 0x57F287);
        assert_eq!(embed["timestamp"], "2026-08-26T12:00:00+00:00");
        assert_eq!(embed["footer"]["text"], "demo");
        assert_eq!(embed["footer"]["icon_url"], "https://example.com/icon.png");
    }

    #[test]
    fn test_payload_omits_absent_footer_icon() {
        let sink =
            DiscordSink::new("https://discord.invalid/api/webhooks/x", Duration::from_secs(5))
                .unwrap();
        let value = serde_json::to_value(sink.payload(&message())).unwrap();
        assert!(value["embeds"][0]["footer"]
            .as_object()
            .unwrap()
            .get("icon_url")
            .is_none());
    }

    #[tokio::test]
    async fn test_unresolvable_host_maps_to_network_error() {
        let sink = DiscordSink::new(
            "https://nonexistent.invalid/api/webhooks/x",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = sink.deliver(&message()).await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::Network { .. } | DeliveryError::Timeout { .. }
        ));
    }
}

//! Alert delivery to Discord

use crate::errors::{MonitorError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Discord rejects embed descriptions longer than this
const MAX_DESCRIPTION_CHARS: usize = 4096;

const ALERT_COLOR: u32 = 0xE74C3C;
const INFO_COLOR: u32 = 0x3498DB;

/// Sends monitoring messages to an external channel. Delivery failures come
/// back as `Err`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_notification(&self, message: &str, is_alert: bool) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: &'static str,
    description: String,
    color: u32,
    timestamp: String,
    footer: Footer,
}

#[derive(Debug, Serialize)]
struct Footer {
    text: &'static str,
}

/// Notifier posting to a Discord webhook
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    client: Client,
    webhook_url: Option<String>,
    username: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Option<String>, username: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self {
            client,
            webhook_url,
            username: username.into(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn payload<'a>(&'a self, message: &str, is_alert: bool) -> WebhookPayload<'a> {
        let (title, color, content) = if is_alert {
            ("🚨 Alerte monitoring", ALERT_COLOR, Some("@here"))
        } else {
            ("ℹ️ Information monitoring", INFO_COLOR, None)
        };

        WebhookPayload {
            username: &self.username,
            content,
            embeds: vec![Embed {
                title,
                description: message.chars().take(MAX_DESCRIPTION_CHARS).collect(),
                color,
                timestamp: Utc::now().to_rfc3339(),
                footer: Footer {
                    text: "Service de monitoring CRM",
                },
            }],
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send_notification(&self, message: &str, is_alert: bool) -> Result<()> {
        let url = self
            .webhook_url
            .as_deref()
            .ok_or_else(|| MonitorError::Config("DISCORD_WEBHOOK_URL is not set".to_string()))?;

        let response = self
            .client
            .post(url)
            .json(&self.payload(message, is_alert))
            .send()
            .await
            .map_err(|e| {
                warn!("Discord webhook unreachable: {}", e);
                MonitorError::Notification(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Discord webhook rejected notification ({}): {}", status, body);
            return Err(MonitorError::Notification(format!(
                "webhook responded with status {}",
                status
            )));
        }

        debug!("Discord notification delivered (alert: {})", is_alert);
        Ok(())
    }
}

//! Alert delivery.

use crate::error::AlertError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Delivers one human-readable message to an external channel.
///
/// Delivery is fire-and-verify: a single attempt whose outcome is returned
/// to the caller. No queueing, no retry.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), AlertError>;
}

pub type SharedAlertSink = Arc<dyn AlertSink>;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts `{"text": ...}` to an incoming-webhook URL (Slack-compatible).
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    url: Url,
}

impl WebhookSink {
    pub fn new(url: Url) -> Result<Self, AlertError> {
        let client = Client::builder().use_rustls_tls().build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    async fn send(&self, text: &str) -> Result<(), AlertError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::Rejected { status, body });
        }

        debug!("alert delivered to webhook");
        Ok(())
    }
}

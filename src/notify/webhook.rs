use std::time::Duration;

use async_trait::async_trait;

use super::{DeliveryError, Notifier};
use crate::config::SlackWebhook;
use crate::message::NotificationMessage;

/// POSTs messages as JSON to the destination URL
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(
        &self,
        name: &str,
        destination: &SlackWebhook,
        message: &NotificationMessage,
    ) -> Result<(), DeliveryError> {
        let payload = serde_json::to_vec(message)?;

        let response = self
            .client
            .post(&destination.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeliveryError::Status(response.status().as_u16()));
        }

        tracing::debug!(destination = %name, url = %destination.url, "Webhook notification sent");
        Ok(())
    }
}

/// Logs messages instead of sending them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        name: &str,
        destination: &SlackWebhook,
        message: &NotificationMessage,
    ) -> Result<(), DeliveryError> {
        let payload = serde_json::to_string(message)?;
        tracing::info!(
            destination = %name,
            url = %destination.url,
            blocks = message.blocks.len(),
            "Notification (dry run): {}",
            payload
        );
        Ok(())
    }
}

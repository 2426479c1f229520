//! Notification delivery

pub mod webhook;

pub use webhook::{LogNotifier, WebhookNotifier};

use async_trait::async_trait;

use crate::config::SlackWebhook;
use crate::message::NotificationMessage;

/// Delivers a composed message to one destination
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        name: &str,
        destination: &SlackWebhook,
        message: &NotificationMessage,
    ) -> Result<(), DeliveryError>;
}

/// Delivery errors
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to send webhook: {0}")]
    Network(String),

    #[error("Webhook returned status {0}")]
    Status(u16),
}

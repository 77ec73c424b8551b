// steward-core/src/ports/notifier.rs

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum NotificationError {
    #[error("Notifications are not configured: {variable} is not set")]
    #[diagnostic(
        code(steward::notify::not_configured),
        help("Export {variable} before running, or disable notifications.")
    )]
    NotConfigured { variable: String },

    #[error("Message delivery failed: {0}")]
    #[diagnostic(code(steward::notify::delivery))]
    DeliveryFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub channel: String,
    pub timestamp: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, text: &str) -> Result<DeliveryReceipt, NotificationError>;
}

//! Notifier trait definition and shared error types.

use std::collections::HashMap;

/// Errors that can occur during reminder delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// A rendered reminder ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    /// The rendered subject/title.
    pub subject: String,
    /// The rendered body content.
    pub body: String,
    /// Additional metadata (e.g., task id, scheduled instant).
    pub metadata: HashMap<String, String>,
}

/// Trait for delivery channel implementations.
///
/// `destination` is channel-specific: a URL for webhooks, an email
/// address for SMTP. Implementations must be safe to call again for the
/// same plan instant (at-least-once delivery).
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification to the given destination.
    async fn send(&self, destination: &str, notification: &Notification)
        -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "webhook", "email").
    fn channel_name(&self) -> &str;
}

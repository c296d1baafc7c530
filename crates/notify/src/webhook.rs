//! Generic HTTP webhook notifier.
//!
//! Delivers reminders as JSON payloads. The destination URL comes from the
//! task (each task may point at its own hook); headers shared across all
//! deliveries are configured once on the notifier.

use std::collections::HashMap;

use crate::traits::{Notification, Notifier, NotifyError};

/// Delivers notifications as JSON over HTTP POST to per-task destinations.
#[derive(Debug)]
pub struct WebhookNotifier {
    /// Custom headers to include on every request.
    headers: HashMap<String, String>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(headers: HashMap<String, String>) -> Self {
        Self {
            headers,
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    /// Deliver a notification as a JSON payload to the destination URL.
    async fn send(
        &self,
        destination: &str,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        if !destination.starts_with("http://") && !destination.starts_with("https://") {
            return Err(NotifyError::Config(format!(
                "webhook destination must be an http(s) URL, got '{destination}'"
            )));
        }

        let mut request = self
            .client
            .post(destination)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(notification);

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %destination,
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Rejected(format!(
                "webhook returned {status}: {body_text}"
            )));
        }

        tracing::debug!(
            url = %destination,
            status = %status,
            "webhook notification delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

//! SMTP email notifier via `lettre` with TLS support.
//!
//! The destination is the recipient address; sender and transport are
//! configured once. Supports STARTTLS and implicit TLS connections.

use crate::traits::{Notification, Notifier, NotifyError};
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

/// Sends reminders as emails via SMTP to per-task recipient addresses.
#[derive(Debug)]
pub struct EmailNotifier {
    /// Async SMTP transport for sending emails.
    transport: AsyncSmtpTransport<Tokio1Executor>,
    /// Sender mailbox.
    from: Mailbox,
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from SMTP configuration.
    ///
    /// - `smtp_host`: SMTP server hostname.
    /// - `smtp_port`: Optional port (defaults to 587).
    /// - `tls`: `None` or `Some(true)` enables STARTTLS; port 465 always
    ///   uses TLS regardless of this flag.
    /// - `from`: Sender address (e.g. `"Reminders <noreply@example.com>"`).
    ///
    /// SMTP credentials are resolved from the `SMTP_USERNAME` and
    /// `SMTP_PASSWORD` environment variables; if both are set they are
    /// passed to the transport, otherwise the connection is
    /// unauthenticated.
    pub fn from_config(
        smtp_host: &str,
        smtp_port: Option<u16>,
        tls: Option<bool>,
        from: &str,
    ) -> Result<Self, NotifyError> {
        let from_mailbox: Mailbox = from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let port = smtp_port.unwrap_or(587);
        let use_tls = tls.unwrap_or(true);

        let mut builder = if port == 465 || use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host).port(port)
        };

        if let (Ok(username), Ok(password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from: from_mailbox,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    /// Send a reminder email to the destination address.
    async fn send(
        &self,
        destination: &str,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let to: Mailbox = destination
            .parse()
            .map_err(|e: lettre::address::AddressError| {
                NotifyError::Config(format!("invalid recipient '{destination}': {e}"))
            })?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&notification.subject)
            .body(notification.body.clone())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            recipient = %destination,
            subject = %notification.subject,
            "notification delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn from_config_valid() {
        let notifier = EmailNotifier::from_config(
            "smtp.example.com",
            Some(587),
            Some(true),
            "reminders@example.com",
        );
        assert!(notifier.is_ok());
    }

    #[test]
    fn from_config_invalid_from_address() {
        let result = EmailNotifier::from_config("smtp.example.com", None, None, "bad-address");
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Configuration error"), "got: {err}");
    }

    #[tokio::test]
    async fn send_rejects_invalid_recipient() {
        let notifier = EmailNotifier::from_config(
            "smtp.example.com",
            Some(587),
            Some(true),
            "reminders@example.com",
        )
        .unwrap();
        let notification = Notification {
            subject: "s".to_string(),
            body: "b".to_string(),
            metadata: HashMap::new(),
        };
        let result = notifier.send("not-an-email", &notification).await;
        match result.unwrap_err() {
            NotifyError::Config(msg) => assert!(msg.contains("invalid recipient")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn channel_name_is_email() {
        let notifier = EmailNotifier::from_config(
            "smtp.example.com",
            Some(465),
            None,
            "reminders@example.com",
        )
        .unwrap();
        assert_eq!(notifier.channel_name(), "email");
    }
}

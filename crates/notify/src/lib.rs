//! Reminder delivery channels.
//!
//! The scheduler hands each claimed plan's rendered message to a
//! [`Notifier`] together with the task's destination. Channels are
//! at-least-once: the scheduler may retry a delivery that timed out even
//! if it actually went through, so payloads must be safe to re-send.

mod email;
mod templating;
mod traits;
mod webhook;

pub use email::EmailNotifier;
pub use templating::{
    PlanContext, ReminderContext, TaskContext, TemplateRenderer, DEFAULT_BODY, DEFAULT_SUBJECT,
};
pub use traits::{Notification, Notifier, NotifyError};
pub use webhook::WebhookNotifier;

//! Minijinja template rendering for reminder messages.
//!
//! Renders the reminder subject and body from task metadata and the plan
//! being executed. Templates are arbitrary strings (not pre-registered),
//! so a fresh [`minijinja::Environment`] is created per render call.

use crate::traits::NotifyError;

/// Default subject template used when no override is configured.
pub const DEFAULT_SUBJECT: &str = "[reminder] {{ task.title }}";

/// Default body template used when no override is configured.
pub const DEFAULT_BODY: &str = "\
{{ task.title }} is due at {{ plan.scheduled_date }} {{ plan.scheduled_time }}.
{% if task.description %}{{ task.description }}{% endif %}";

/// Context data available to reminder templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReminderContext {
    pub task: TaskContext,
    pub plan: PlanContext,
    /// Current timestamp in ISO 8601 format.
    pub now: String,
}

/// Task metadata exposed to templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskContext {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Plan fields exposed to templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PlanContext {
    /// Scheduled date as `YYYY-MM-DD`.
    pub scheduled_date: String,
    /// Scheduled time as `HH:MM`.
    pub scheduled_time: String,
    pub retry_count: u32,
}

/// Renders reminder templates using minijinja.
#[derive(Debug)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("upper", |v: String| v.to_uppercase());
        env.add_filter("lower", |v: String| v.to_lowercase());
        env
    }

    /// Render a template string with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, ctx: &ReminderContext) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Validate that a template string parses without errors.
    ///
    /// This does not evaluate the template, it only checks syntax.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

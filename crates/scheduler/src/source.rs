//! Task metadata lookup and reminder message construction.
//!
//! The scheduler stores plans by `task_id` only; titles, descriptions,
//! and delivery destinations live in a [`TaskDirectory`]. The file-backed
//! directory reads a YAML file once at startup, which is enough for a
//! worker deployment where task edits roll out with a restart.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use cadence_core::plan::ExecutionPlan;
use cadence_notify::{
    Notification, NotifyError, PlanContext, ReminderContext, TaskContext, TemplateRenderer,
    DEFAULT_BODY, DEFAULT_SUBJECT,
};

/// Task metadata needed to deliver a reminder.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Channel-specific destination: a webhook URL or an email address.
    pub destination: String,
}

/// Read-only lookup from task id to task metadata.
pub trait TaskDirectory: Send + Sync {
    fn get(&self, task_id: &str) -> Option<TaskInfo>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read tasks file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tasks file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error(transparent)]
    Render(#[from] NotifyError),
}

#[derive(Debug, Deserialize)]
struct TasksFile {
    tasks: Vec<TaskInfo>,
}

/// Task directory backed by a YAML file loaded at startup.
#[derive(Debug, Default)]
pub struct FileTaskDirectory {
    tasks: HashMap<String, TaskInfo>,
}

impl FileTaskDirectory {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: TasksFile =
            serde_yaml::from_str(&text).map_err(|source| SourceError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        let tasks: HashMap<String, TaskInfo> =
            file.tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        info!(path = %path.display(), tasks = tasks.len(), "task directory loaded");
        Ok(Self { tasks })
    }
}

impl TaskDirectory for FileTaskDirectory {
    fn get(&self, task_id: &str) -> Option<TaskInfo> {
        self.tasks.get(task_id).cloned()
    }
}

/// In-memory task directory for tests and embedded use.
#[derive(Debug, Default)]
pub struct StaticTaskDirectory {
    tasks: HashMap<String, TaskInfo>,
}

impl StaticTaskDirectory {
    pub fn new(tasks: impl IntoIterator<Item = TaskInfo>) -> Self {
        Self {
            tasks: tasks.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }
}

impl TaskDirectory for StaticTaskDirectory {
    fn get(&self, task_id: &str) -> Option<TaskInfo> {
        self.tasks.get(task_id).cloned()
    }
}

/// Builds the rendered reminder message for a claimed plan.
pub struct MessageBuilder {
    renderer: TemplateRenderer,
    subject_template: String,
    body_template: String,
}

impl MessageBuilder {
    pub fn new(subject_template: Option<String>, body_template: Option<String>) -> Self {
        Self {
            renderer: TemplateRenderer::new(),
            subject_template: subject_template.unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            body_template: body_template.unwrap_or_else(|| DEFAULT_BODY.to_string()),
        }
    }

    /// Render the reminder for one plan. Returns the delivery destination
    /// and the notification payload.
    pub fn build(
        &self,
        task: &TaskInfo,
        plan: &ExecutionPlan,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(String, Notification), SourceError> {
        let ctx = ReminderContext {
            task: TaskContext {
                id: task.id.clone(),
                title: task.title.clone(),
                description: task.description.clone(),
                tags: task.tags.clone(),
            },
            plan: PlanContext {
                scheduled_date: plan.scheduled_date.format("%Y-%m-%d").to_string(),
                scheduled_time: plan.scheduled_time.format("%H:%M").to_string(),
                retry_count: plan.retry_count,
            },
            now: now.to_rfc3339(),
        };

        let subject = self.renderer.render(&self.subject_template, &ctx)?;
        let body = self.renderer.render(&self.body_template, &ctx)?;

        let mut metadata = HashMap::new();
        metadata.insert("task_id".to_string(), task.id.clone());
        metadata.insert("plan_id".to_string(), plan.id.to_string());
        metadata.insert(
            "scheduled_date".to_string(),
            ctx.plan.scheduled_date.clone(),
        );
        metadata.insert(
            "scheduled_time".to_string(),
            ctx.plan.scheduled_time.clone(),
        );

        Ok((
            task.destination.clone(),
            Notification {
                subject,
                body,
                metadata,
            },
        ))
    }
}

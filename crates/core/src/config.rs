use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub postgres: PostgresConfig,
    pub calendar: CalendarConfig,
    pub notify: NotifyConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            scheduler: SchedulerConfig::from_env(),
            postgres: PostgresConfig::from_env(),
            calendar: CalendarConfig::from_env(),
            notify: NotifyConfig::from_env(),
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between scheduler ticks.
    pub tick_interval_secs: u64,
    /// Maximum delivery attempts before a plan is terminally failed.
    pub max_retries: u32,
    /// Whether failed plans are re-armed at all.
    pub retry_enabled: bool,
    /// Backoff before a retry attempt, in seconds. 0 = retry immediately.
    pub retry_backoff_secs: u64,
    /// Upper bound on concurrent notifier invocations per tick.
    pub concurrency: u32,
    /// Notifier call timeout in seconds.
    pub notifier_timeout_secs: u64,
    /// Maximum due plans fetched per tick.
    pub batch_limit: u32,
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            tick_interval_secs: env_u64("TICK_INTERVAL_SECS", 60),
            max_retries: env_u32("MAX_RETRIES", 3),
            retry_enabled: env_bool("RETRY_ENABLED", true),
            retry_backoff_secs: env_u64("RETRY_BACKOFF_SECS", 0),
            concurrency: env_u32("SCHEDULER_CONCURRENCY", 8),
            notifier_timeout_secs: env_u64("NOTIFIER_TIMEOUT_SECS", 30),
            batch_limit: env_u32("SCHEDULER_BATCH_LIMIT", 200),
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub sslmode: String,
}

impl PostgresConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("PG_HOST", "localhost"),
            port: env_u16("PG_PORT", 5432),
            user: env_or("PG_USER", ""),
            password: env_or("PG_PASSWORD", ""),
            database: env_or("PG_DATABASE", "cadence"),
            sslmode: env_or("PG_SSLMODE", "prefer"),
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = env_opt("PG_URL") {
            return url;
        }
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.database, self.sslmode
        )
    }

    /// Whether enough of the connection is configured to attempt a connect.
    pub fn is_configured(&self) -> bool {
        env_opt("PG_URL").is_some() || !self.user.is_empty()
    }
}

// ── Holiday calendar ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Directory holding per-year holiday YAML files.
    pub dir: String,
}

impl CalendarConfig {
    pub fn from_env() -> Self {
        Self {
            dir: env_or("CALENDAR_DIR", "data/calendar"),
        }
    }
}

// ── Notification ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Delivery channel: "webhook" or "email".
    pub channel: String,
    /// Path to the task directory YAML file (task metadata + destinations).
    pub tasks_file: String,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_from: Option<String>,
    /// Optional minijinja template overrides for subject/body.
    pub subject_template: Option<String>,
    pub body_template: Option<String>,
}

impl NotifyConfig {
    pub fn from_env() -> Self {
        Self {
            channel: env_or("NOTIFY_CHANNEL", "webhook"),
            tasks_file: env_or("TASKS_FILE", "data/tasks.yaml"),
            smtp_host: env_opt("SMTP_HOST"),
            smtp_port: env_opt("SMTP_PORT").and_then(|v| v.parse().ok()),
            smtp_from: env_opt("SMTP_FROM"),
            subject_template: env_opt("NOTIFY_SUBJECT_TEMPLATE"),
            body_template: env_opt("NOTIFY_BODY_TEMPLATE"),
        }
    }
}

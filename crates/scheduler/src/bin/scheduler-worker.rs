//! scheduler-worker — standalone reminder delivery worker.
//!
//! Ticks over due execution plans in PostgreSQL, claims them, and delivers
//! reminders through the configured channel (webhook or email). Safe to run
//! in multiple replicas: the claim is a conditional update, so each plan
//! fires at most once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Notify;
use tracing::info;

use cadence_core::config::{load_dotenv, Config};
use cadence_notify::{EmailNotifier, Notifier, WebhookNotifier};
use cadence_planner::{connect_pg, PgPlanStore};
use cadence_scheduler::{
    Backoff, FileTaskDirectory, LoopOptions, MessageBuilder, RetryPolicy, SchedulerLoop,
};

/// Reminder delivery worker.
#[derive(Parser, Debug)]
#[command(name = "scheduler-worker", version, about)]
struct Cli {
    /// Path to the task directory YAML file.
    #[arg(long, env = "TASKS_FILE", default_value = "data/tasks.yaml")]
    tasks_file: String,

    /// Delivery channel: "webhook" or "email".
    #[arg(long, env = "NOTIFY_CHANNEL", default_value = "webhook")]
    channel: String,
}

fn build_notifier(channel: &str, config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    match channel {
        "webhook" => Ok(Arc::new(WebhookNotifier::new(HashMap::new()))),
        "email" => {
            let host = config
                .notify
                .smtp_host
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("SMTP_HOST is required for the email channel"))?;
            let from = config
                .notify
                .smtp_from
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("SMTP_FROM is required for the email channel"))?;
            let notifier = EmailNotifier::from_config(host, config.notify.smtp_port, None, from)?;
            Ok(Arc::new(notifier))
        }
        other => anyhow::bail!("unknown notify channel '{other}' (expected webhook or email)"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = Config::from_env();

    if !config.postgres.is_configured() {
        anyhow::bail!("PostgreSQL is not configured (set PG_URL or PG_USER)");
    }

    let pool = connect_pg(&config.postgres).await?;
    let store = Arc::new(PgPlanStore::new(pool));

    let directory = Arc::new(FileTaskDirectory::load(&cli.tasks_file)?);
    let notifier = build_notifier(&cli.channel, &config)?;
    info!(channel = notifier.channel_name(), "notifier ready");

    let messages = MessageBuilder::new(
        config.notify.subject_template.clone(),
        config.notify.body_template.clone(),
    );

    let backoff = if config.scheduler.retry_backoff_secs == 0 {
        Backoff::Immediate
    } else {
        Backoff::Fixed(chrono::Duration::seconds(
            config.scheduler.retry_backoff_secs as i64,
        ))
    };
    let policy = RetryPolicy::new(
        config.scheduler.max_retries,
        config.scheduler.retry_enabled,
        backoff,
    );

    let options = LoopOptions {
        tick_interval: Duration::from_secs(config.scheduler.tick_interval_secs),
        notifier_timeout: Duration::from_secs(config.scheduler.notifier_timeout_secs),
        concurrency: config.scheduler.concurrency as usize,
        batch_limit: config.scheduler.batch_limit,
    };

    let scheduler = Arc::new(SchedulerLoop::new(
        store, directory, notifier, messages, policy, options,
    ));

    let shutdown = Arc::new(Notify::new());
    let shutdown_for_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown_for_signal.notify_waiters();
        }
    });

    info!("scheduler-worker starting");
    scheduler.run(shutdown).await;
    info!("scheduler-worker exited cleanly");
    Ok(())
}

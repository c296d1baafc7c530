//! The scheduler tick loop.
//!
//! Each tick fetches due pending plans, claims them one by one, and fans
//! the deliveries out under a concurrency bound. The claim is the only
//! point of mutual exclusion: once a worker wins it, no other replica
//! will touch that plan. A failure in any single plan never aborts the
//! tick; the plan is failed or re-armed and the loop moves on.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use cadence_core::plan::ExecutionPlan;
use cadence_notify::Notifier;
use cadence_planner::{ClaimOutcome, PlanStore, StoreError};

use crate::policy::{RetryDecision, RetryPolicy};
use crate::source::{MessageBuilder, TaskDirectory};

/// Tunables for the tick loop.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub tick_interval: Duration,
    pub notifier_timeout: Duration,
    pub concurrency: usize,
    pub batch_limit: u32,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            notifier_timeout: Duration::from_secs(30),
            concurrency: 8,
            batch_limit: 200,
        }
    }
}

/// Per-tick delivery accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub due: usize,
    pub delivered: usize,
    pub rearmed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub lost: usize,
}

enum PlanOutcome {
    Delivered,
    Rearmed,
    Failed,
    Cancelled,
    Lost,
    StoreError,
}

pub struct SchedulerLoop<S> {
    store: Arc<S>,
    directory: Arc<dyn TaskDirectory>,
    notifier: Arc<dyn Notifier>,
    messages: MessageBuilder,
    policy: RetryPolicy,
    options: LoopOptions,
}

impl<S: PlanStore + 'static> SchedulerLoop<S> {
    pub fn new(
        store: Arc<S>,
        directory: Arc<dyn TaskDirectory>,
        notifier: Arc<dyn Notifier>,
        messages: MessageBuilder,
        policy: RetryPolicy,
        options: LoopOptions,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            messages,
            policy,
            options,
        }
    }

    /// Run ticks until `shutdown` fires.
    pub async fn run(self: Arc<Self>, shutdown: Arc<Notify>) {
        let mut interval = tokio::time::interval(self.options.tick_interval);
        info!(
            tick_secs = self.options.tick_interval.as_secs(),
            concurrency = self.options.concurrency,
            "scheduler loop started"
        );
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let summary = self.tick(Utc::now()).await;
                    if summary.due > 0 {
                        info!(
                            due = summary.due,
                            delivered = summary.delivered,
                            rearmed = summary.rearmed,
                            failed = summary.failed,
                            cancelled = summary.cancelled,
                            "tick complete"
                        );
                    }
                }
                _ = shutdown.notified() => {
                    info!("scheduler loop shutting down");
                    break;
                }
            }
        }
    }

    /// Process every due plan once. Public so tests and one-shot admin
    /// commands can drive the loop manually.
    pub async fn tick(self: &Arc<Self>, now: DateTime<Utc>) -> TickSummary {
        let due = match self.store.due_pending(now, self.options.batch_limit).await {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "failed to fetch due plans");
                return TickSummary::default();
            }
        };

        let mut summary = TickSummary {
            due: due.len(),
            ..TickSummary::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let mut tasks = JoinSet::new();

        for plan in due {
            let this = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                // Closed only if the semaphore is dropped, which it is not.
                let _permit = semaphore.acquire().await.ok()?;
                Some(this.process(plan, now).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(PlanOutcome::Delivered)) => summary.delivered += 1,
                Ok(Some(PlanOutcome::Rearmed)) => summary.rearmed += 1,
                Ok(Some(PlanOutcome::Failed)) => summary.failed += 1,
                Ok(Some(PlanOutcome::Cancelled)) => summary.cancelled += 1,
                Ok(Some(PlanOutcome::Lost)) => summary.lost += 1,
                Ok(Some(PlanOutcome::StoreError)) | Ok(None) => {}
                Err(e) => error!(error = %e, "plan delivery task panicked"),
            }
        }

        summary
    }

    async fn process(&self, plan: ExecutionPlan, now: DateTime<Utc>) -> PlanOutcome {
        let plan = match self.store.claim(plan.id).await {
            Ok(ClaimOutcome::Claimed(plan)) => plan,
            Ok(ClaimOutcome::Lost) => return PlanOutcome::Lost,
            Ok(ClaimOutcome::Cancelled) => {
                info!(plan_id = %plan.id, task_id = %plan.task_id, "cancelled plan skipped");
                return PlanOutcome::Cancelled;
            }
            Err(e) => {
                error!(plan_id = %plan.id, error = %e, "claim failed");
                return PlanOutcome::StoreError;
            }
        };

        match self.deliver(&plan, now).await {
            Ok(()) => match self.store.complete(plan.id, Utc::now()).await {
                Ok(()) => PlanOutcome::Delivered,
                Err(e) => {
                    error!(plan_id = %plan.id, error = %e, "failed to record completion");
                    PlanOutcome::StoreError
                }
            },
            Err(reason) => self.handle_failure(&plan, &reason, now).await,
        }
    }

    async fn deliver(&self, plan: &ExecutionPlan, now: DateTime<Utc>) -> Result<(), String> {
        let task = self
            .directory
            .get(&plan.task_id)
            .ok_or_else(|| format!("unknown task: {}", plan.task_id))?;

        let (destination, notification) = self
            .messages
            .build(&task, plan, now)
            .map_err(|e| e.to_string())?;

        let send = self.notifier.send(&destination, &notification);
        match tokio::time::timeout(self.options.notifier_timeout, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "notifier timed out after {}s",
                self.options.notifier_timeout.as_secs()
            )),
        }
    }

    async fn handle_failure(
        &self,
        plan: &ExecutionPlan,
        reason: &str,
        now: DateTime<Utc>,
    ) -> PlanOutcome {
        warn!(
            plan_id = %plan.id,
            task_id = %plan.task_id,
            retry_count = plan.retry_count,
            error = %reason,
            "delivery failed"
        );

        let result: Result<PlanOutcome, StoreError> =
            match self.policy.decide(plan.retry_count, now) {
                RetryDecision::Rearm(next_attempt_at) => self
                    .store
                    .rearm(plan.id, next_attempt_at, reason)
                    .await
                    .map(|_| PlanOutcome::Rearmed),
                RetryDecision::Exhausted => self
                    .store
                    .fail(plan.id, reason)
                    .await
                    .map(|_| PlanOutcome::Failed),
            };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(plan_id = %plan.id, error = %e, "failed to record delivery failure");
                PlanOutcome::StoreError
            }
        }
    }
}

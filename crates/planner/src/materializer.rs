//! Idempotent plan materialization.
//!
//! Reconciles the stored plans of a task against the occurrence set its
//! rule currently produces. Matching by the `(date, time)` key rather
//! than wholesale delete-and-recreate keeps execution history and
//! in-flight work intact across rule edits.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use cadence_calendar::HolidayCalendar;
use cadence_core::plan::{ExecutionPlan, PlanStatus};
use cadence_core::rule::ScheduleRule;
use cadence_core::window::DateWindow;
use cadence_recurrence::{apply_exclusions, generate};

use crate::store::{PlanStore, StoreError};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeSummary {
    pub created: usize,
    pub deleted: usize,
    pub kept: usize,
}

/// Reconciles desired occurrences against stored plans, task by task.
pub struct Materializer<S> {
    store: Arc<S>,
    // One guard per task so concurrent regeneration requests for the same
    // task serialize instead of racing on insert/delete.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: PlanStore> Materializer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn task_lock(&self, task_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Regenerate the plans of one task over `window`.
    ///
    /// Desired instants are the rule's occurrence dates (post-exclusion)
    /// crossed with its execution times. Stored plans whose key matches a
    /// desired instant are kept untouched regardless of status. Stored
    /// pending plans with no desired counterpart are deleted; executing
    /// and terminal plans are never deleted. Missing instants become fresh
    /// pending plans.
    pub async fn regenerate(
        &self,
        task_id: &str,
        rule: &ScheduleRule,
        window: &DateWindow,
        calendar: &dyn HolidayCalendar,
        now: DateTime<Utc>,
    ) -> Result<MaterializeSummary, StoreError> {
        let lock = self.task_lock(task_id).await;
        let _guard = lock.lock().await;

        let dates = apply_exclusions(generate(rule, window, calendar), &rule.exclusions, calendar);
        let desired: BTreeSet<(NaiveDate, NaiveTime)> = dates
            .iter()
            .flat_map(|&d| rule.execution_times.iter().map(move |&t| (d, t)))
            .collect();

        let existing = self.store.plans_for_task(task_id, window).await?;
        let mut summary = MaterializeSummary::default();
        let mut present: BTreeSet<(NaiveDate, NaiveTime)> = BTreeSet::new();

        for plan in existing {
            if desired.contains(&plan.key()) {
                present.insert(plan.key());
                summary.kept += 1;
                continue;
            }
            match plan.status {
                PlanStatus::Pending => {
                    debug!(task_id, plan_id = %plan.id, date = %plan.scheduled_date,
                           "deleting stale pending plan");
                    self.store.delete(plan.id).await?;
                    summary.deleted += 1;
                }
                // In-flight and terminal plans stay as history even when the
                // rule no longer produces their instant.
                _ => {
                    summary.kept += 1;
                }
            }
        }

        for &(date, time) in desired.difference(&present) {
            let plan = ExecutionPlan::new_pending(task_id, date, time, now);
            self.store.insert(plan).await?;
            summary.created += 1;
        }

        info!(
            task_id,
            created = summary.created,
            deleted = summary.deleted,
            kept = summary.kept,
            "plans regenerated"
        );
        Ok(summary)
    }
}

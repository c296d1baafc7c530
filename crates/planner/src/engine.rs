//! The scheduling engine facade.
//!
//! Bundles rule compilation, occurrence preview, plan regeneration, and
//! the manual plan operations behind one object so callers (worker bins,
//! admin surfaces) hold a single handle.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use cadence_calendar::HolidayCalendar;
use cadence_core::plan::{ExecutionPlan, PlanStatus};
use cadence_core::rule::ScheduleRule;
use cadence_core::window::DateWindow;
use cadence_recurrence::{compile, preview_occurrences, RawScheduleRule, RuleValidationError};

use crate::materializer::{MaterializeSummary, Materializer};
use crate::store::{PlanPage, PlanStore, StoreError};

pub struct SchedulingEngine<S> {
    store: Arc<S>,
    materializer: Materializer<S>,
    calendar: Arc<dyn HolidayCalendar>,
}

impl<S: PlanStore> SchedulingEngine<S> {
    pub fn new(store: Arc<S>, calendar: Arc<dyn HolidayCalendar>) -> Self {
        Self {
            materializer: Materializer::new(store.clone()),
            store,
            calendar,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Validate and canonicalize a raw rule description.
    pub fn compile(&self, raw: &RawScheduleRule) -> Result<ScheduleRule, RuleValidationError> {
        compile(raw)
    }

    /// Expand a rule into its `(date, time)` instants over a window
    /// without touching stored plans.
    pub fn preview_occurrences(
        &self,
        rule: &ScheduleRule,
        window: &DateWindow,
    ) -> Vec<(NaiveDate, NaiveTime)> {
        preview_occurrences(rule, window, self.calendar.as_ref())
    }

    /// Reconcile a task's stored plans against its rule.
    pub async fn regenerate_plans(
        &self,
        task_id: &str,
        rule: &ScheduleRule,
        window: &DateWindow,
        now: DateTime<Utc>,
    ) -> Result<MaterializeSummary, StoreError> {
        self.materializer
            .regenerate(task_id, rule, window, self.calendar.as_ref(), now)
            .await
    }

    /// Pending plans of a task inside the window, soonest first.
    pub async fn list_upcoming(
        &self,
        task_id: &str,
        window: &DateWindow,
    ) -> Result<Vec<ExecutionPlan>, StoreError> {
        let plans = self.store.plans_for_task(task_id, window).await?;
        Ok(plans
            .into_iter()
            .filter(|p| p.status == PlanStatus::Pending)
            .collect())
    }

    /// Paged plan history, optionally filtered by status.
    pub async fn list_history(
        &self,
        task_id: &str,
        window: &DateWindow,
        status: Option<PlanStatus>,
        page: u32,
        page_size: u32,
    ) -> Result<PlanPage, StoreError> {
        self.store
            .list(task_id, window, status, page, page_size)
            .await
    }

    /// Manually re-arm a terminally failed plan with a fresh retry budget.
    pub async fn retry(&self, plan_id: Uuid) -> Result<(), StoreError> {
        self.store.manual_retry(plan_id).await
    }

    /// Manually skip a pending plan.
    pub async fn skip(&self, plan_id: Uuid) -> Result<(), StoreError> {
        self.store.skip(plan_id).await
    }

    /// Flag one plan for cancellation.
    pub async fn request_cancel(&self, plan_id: Uuid) -> Result<(), StoreError> {
        self.store.request_cancel(plan_id).await
    }

    /// Flag every non-terminal plan of a task for cancellation.
    pub async fn cancel_task(&self, task_id: &str) -> Result<u64, StoreError> {
        self.store.cancel_task(task_id).await
    }
}

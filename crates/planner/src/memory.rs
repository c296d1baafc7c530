//! In-memory plan store for tests and embedded use.
//!
//! Claim atomicity comes from the store-wide mutex: the status check and
//! update happen under one lock acquisition, mirroring the conditional
//! UPDATE of the PostgreSQL store.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cadence_core::plan::{next_status, ExecutionPlan, PlanStatus, PlanTransition};
use cadence_core::window::DateWindow;

use crate::store::{ClaimOutcome, PlanPage, PlanStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryPlanStore {
    plans: Mutex<HashMap<Uuid, ExecutionPlan>>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_plan<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ExecutionPlan) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut plans = self.plans.lock().expect("plan store mutex poisoned");
        let plan = plans.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        f(plan)
    }
}

fn sort_due(plans: &mut [ExecutionPlan]) {
    // Priority override first (higher wins, none last), then scheduled
    // instant.
    plans.sort_by(|a, b| {
        match (b.priority_override, a.priority_override) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then_with(|| a.scheduled_at().cmp(&b.scheduled_at()))
    });
}

#[async_trait::async_trait]
impl PlanStore for MemoryPlanStore {
    async fn plans_for_task(
        &self,
        task_id: &str,
        window: &DateWindow,
    ) -> Result<Vec<ExecutionPlan>, StoreError> {
        let plans = self.plans.lock().expect("plan store mutex poisoned");
        let mut out: Vec<ExecutionPlan> = plans
            .values()
            .filter(|p| p.task_id == task_id && window.contains(p.scheduled_date))
            .cloned()
            .collect();
        out.sort_by_key(|p| p.scheduled_at());
        Ok(out)
    }

    async fn get(&self, id: Uuid) -> Result<ExecutionPlan, StoreError> {
        let plans = self.plans.lock().expect("plan store mutex poisoned");
        plans.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn insert(&self, plan: ExecutionPlan) -> Result<(), StoreError> {
        let mut plans = self.plans.lock().expect("plan store mutex poisoned");
        plans.insert(plan.id, plan);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut plans = self.plans.lock().expect("plan store mutex poisoned");
        plans.remove(&id).ok_or(StoreError::NotFound(id))?;
        Ok(())
    }

    async fn due_pending(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ExecutionPlan>, StoreError> {
        let plans = self.plans.lock().expect("plan store mutex poisoned");
        let mut due: Vec<ExecutionPlan> = plans
            .values()
            .filter(|p| p.status == PlanStatus::Pending && p.is_due(now))
            .cloned()
            .collect();
        sort_due(&mut due);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn claim(&self, id: Uuid) -> Result<ClaimOutcome, StoreError> {
        let mut plans = self.plans.lock().expect("plan store mutex poisoned");
        let plan = plans.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if plan.status != PlanStatus::Pending {
            return Ok(ClaimOutcome::Lost);
        }
        if plan.cancel_requested {
            plan.status = next_status(plan.status, PlanTransition::Skip)?;
            return Ok(ClaimOutcome::Cancelled);
        }
        plan.status = next_status(plan.status, PlanTransition::Claim)?;
        Ok(ClaimOutcome::Claimed(plan.clone()))
    }

    async fn complete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.with_plan(id, |plan| {
            plan.status = next_status(plan.status, PlanTransition::Complete)?;
            plan.actual_execution_time = Some(at);
            Ok(())
        })
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        self.with_plan(id, |plan| {
            plan.status = next_status(plan.status, PlanTransition::Fail)?;
            plan.retry_count += 1;
            plan.error_message = Some(error.to_string());
            Ok(())
        })
    }

    async fn rearm(
        &self,
        id: Uuid,
        next_attempt_at: Option<DateTime<Utc>>,
        error: &str,
    ) -> Result<(), StoreError> {
        self.with_plan(id, |plan| {
            plan.status = next_status(plan.status, PlanTransition::Rearm)?;
            plan.retry_count += 1;
            plan.error_message = Some(error.to_string());
            plan.next_attempt_at = next_attempt_at;
            Ok(())
        })
    }

    async fn skip(&self, id: Uuid) -> Result<(), StoreError> {
        self.with_plan(id, |plan| {
            plan.status = next_status(plan.status, PlanTransition::Skip)?;
            Ok(())
        })
    }

    async fn manual_retry(&self, id: Uuid) -> Result<(), StoreError> {
        self.with_plan(id, |plan| {
            plan.status = next_status(plan.status, PlanTransition::ManualRetry)?;
            plan.retry_count = 0;
            plan.next_attempt_at = None;
            plan.cancel_requested = false;
            Ok(())
        })
    }

    async fn request_cancel(&self, id: Uuid) -> Result<(), StoreError> {
        self.with_plan(id, |plan| {
            plan.cancel_requested = true;
            Ok(())
        })
    }

    async fn cancel_task(&self, task_id: &str) -> Result<u64, StoreError> {
        let mut plans = self.plans.lock().expect("plan store mutex poisoned");
        let mut flagged = 0;
        for plan in plans.values_mut() {
            if plan.task_id == task_id && !plan.status.is_terminal() {
                plan.cancel_requested = true;
                flagged += 1;
            }
        }
        Ok(flagged)
    }

    async fn list(
        &self,
        task_id: &str,
        window: &DateWindow,
        status: Option<PlanStatus>,
        page: u32,
        page_size: u32,
    ) -> Result<PlanPage, StoreError> {
        let plans = self.plans.lock().expect("plan store mutex poisoned");
        let mut matching: Vec<ExecutionPlan> = plans
            .values()
            .filter(|p| {
                p.task_id == task_id
                    && window.contains(p.scheduled_date)
                    && status.map_or(true, |s| p.status == s)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|p| p.scheduled_at());

        let total = matching.len() as u64;
        let start = (page as usize).saturating_mul(page_size as usize);
        let plans = matching
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();
        Ok(PlanPage { plans, total })
    }
}

//! Execution plans and their lifecycle state machine.
//!
//! A plan is one materialized `(task, date, time)` execution instant. All
//! status changes go through [`next_status`], the single transition
//! function; stores validate against it before mutating, so the atomic
//! claim requirement is a property of one function rather than of every
//! call site that touches plan status.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CadenceError;

/// Lifecycle status of an execution plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    Executing,
    Completed,
    Failed,
    Skipped,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Pending => "pending",
            PlanStatus::Executing => "executing",
            PlanStatus::Completed => "completed",
            PlanStatus::Failed => "failed",
            PlanStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PlanStatus::Pending),
            "executing" => Some(PlanStatus::Executing),
            "completed" => Some(PlanStatus::Completed),
            "failed" => Some(PlanStatus::Failed),
            "skipped" => Some(PlanStatus::Skipped),
            _ => None,
        }
    }

    /// Terminal states are never overwritten by regeneration.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlanStatus::Completed | PlanStatus::Failed | PlanStatus::Skipped
        )
    }
}

/// A lifecycle transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTransition {
    /// Pending → Executing. The single point of mutual exclusion.
    Claim,
    /// Executing → Completed.
    Complete,
    /// Executing → Failed (retry budget exhausted or retries disabled).
    Fail,
    /// Executing → Pending (retry re-arm after a recoverable failure).
    Rearm,
    /// Pending → Skipped. Manual/administrative only.
    Skip,
    /// Failed → Pending. Manual re-arm of a terminal failure.
    ManualRetry,
}

impl PlanTransition {
    fn name(&self) -> &'static str {
        match self {
            PlanTransition::Claim => "claim",
            PlanTransition::Complete => "complete",
            PlanTransition::Fail => "fail",
            PlanTransition::Rearm => "rearm",
            PlanTransition::Skip => "skip",
            PlanTransition::ManualRetry => "manual-retry",
        }
    }
}

/// The single plan state transition function.
pub fn next_status(
    current: PlanStatus,
    transition: PlanTransition,
) -> Result<PlanStatus, CadenceError> {
    use PlanStatus::*;
    use PlanTransition::*;
    let next = match (current, transition) {
        (Pending, Claim) => Executing,
        (Executing, Complete) => Completed,
        (Executing, Fail) => Failed,
        (Executing, Rearm) => Pending,
        (Pending, Skip) => Skipped,
        (Failed, ManualRetry) => Pending,
        (from, t) => {
            return Err(CadenceError::InvalidTransition {
                from,
                attempted: t.name(),
            })
        }
    };
    Ok(next)
}

/// A materialized, trackable execution instant for a task.
///
/// Identity is `(task_id, scheduled_date, scheduled_time)`; that key never
/// changes, even across retries (`next_attempt_at` carries the backoff due
/// time instead).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub id: Uuid,
    pub task_id: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub status: PlanStatus,
    pub generated_at: DateTime<Utc>,
    /// Earliest instant a retry may run. `None` means due at the scheduled
    /// instant.
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub actual_execution_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub priority_override: Option<i32>,
    /// Set by administrative cancellation / task deletion. Checked as part
    /// of the atomic claim so a cancelled plan never fires.
    pub cancel_requested: bool,
}

impl ExecutionPlan {
    /// Create a fresh pending plan, as produced by materialization.
    pub fn new_pending(
        task_id: impl Into<String>,
        scheduled_date: NaiveDate,
        scheduled_time: NaiveTime,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: task_id.into(),
            scheduled_date,
            scheduled_time,
            status: PlanStatus::Pending,
            generated_at,
            next_attempt_at: None,
            actual_execution_time: None,
            error_message: None,
            retry_count: 0,
            priority_override: None,
            cancel_requested: false,
        }
    }

    /// The `(date, time)` identity key within a task.
    pub fn key(&self) -> (NaiveDate, NaiveTime) {
        (self.scheduled_date, self.scheduled_time)
    }

    /// The scheduled civil instant.
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.scheduled_date.and_time(self.scheduled_time)
    }

    /// Whether the plan is due at `now`: the scheduled instant has passed
    /// and any retry backoff has elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.scheduled_at() > now.naive_utc() {
            return false;
        }
        match self.next_attempt_at {
            Some(at) => at <= now,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    #[test]
    fn claim_only_from_pending() {
        assert_eq!(
            next_status(PlanStatus::Pending, PlanTransition::Claim).unwrap(),
            PlanStatus::Executing
        );
        assert!(next_status(PlanStatus::Executing, PlanTransition::Claim).is_err());
        assert!(next_status(PlanStatus::Completed, PlanTransition::Claim).is_err());
        assert!(next_status(PlanStatus::Skipped, PlanTransition::Claim).is_err());
    }

    #[test]
    fn terminal_states_reject_automatic_transitions() {
        for status in [PlanStatus::Completed, PlanStatus::Skipped] {
            assert!(status.is_terminal());
            assert!(next_status(status, PlanTransition::Complete).is_err());
            assert!(next_status(status, PlanTransition::Rearm).is_err());
        }
    }

    #[test]
    fn failed_allows_manual_retry_only() {
        assert!(PlanStatus::Failed.is_terminal());
        assert!(next_status(PlanStatus::Failed, PlanTransition::Claim).is_err());
        assert_eq!(
            next_status(PlanStatus::Failed, PlanTransition::ManualRetry).unwrap(),
            PlanStatus::Pending
        );
    }

    #[test]
    fn skip_only_from_pending() {
        assert_eq!(
            next_status(PlanStatus::Pending, PlanTransition::Skip).unwrap(),
            PlanStatus::Skipped
        );
        assert!(next_status(PlanStatus::Executing, PlanTransition::Skip).is_err());
    }

    #[test]
    fn due_respects_backoff() {
        let mut plan = ExecutionPlan::new_pending("t1", d("2025-01-10"), t("09:00"), Utc::now());
        let now = "2025-01-10T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(plan.is_due(now));

        plan.next_attempt_at = Some(now + chrono::Duration::minutes(5));
        assert!(!plan.is_due(now));
        assert!(plan.is_due(now + chrono::Duration::minutes(5)));
    }

    #[test]
    fn not_due_before_scheduled_instant() {
        let plan = ExecutionPlan::new_pending("t1", d("2025-01-10"), t("09:00"), Utc::now());
        let before = "2025-01-10T08:59:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(!plan.is_due(before));
    }
}

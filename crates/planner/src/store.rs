//! Plan persistence trait with the atomic claim primitive.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cadence_core::error::CadenceError;
use cadence_core::plan::{ExecutionPlan, PlanStatus};
use cadence_core::window::DateWindow;

/// Errors from plan persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("plan not found: {0}")]
    NotFound(Uuid),

    #[error("stored plan has invalid status value '{0}'")]
    InvalidStatus(String),

    #[error(transparent)]
    Transition(#[from] CadenceError),
}

/// Result of a claim attempt.
///
/// `Lost` is an expected concurrency outcome, not an error: the losing
/// worker simply no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This worker won the claim; the plan is now `Executing`.
    Claimed(ExecutionPlan),
    /// Another worker claimed the plan first (or it is no longer pending).
    Lost,
    /// The plan had a pending cancellation request; it was transitioned to
    /// `Skipped` instead of being executed.
    Cancelled,
}

/// A page of plans with the unpaged total.
#[derive(Debug, Clone)]
pub struct PlanPage {
    pub plans: Vec<ExecutionPlan>,
    pub total: u64,
}

/// Persistence operations over execution plans.
///
/// Every status mutation validates against the plan FSM
/// ([`cadence_core::plan::next_status`]) and is implemented as a
/// conditional update on the current status, so concurrent mutations
/// cannot produce invalid transitions.
#[async_trait::async_trait]
pub trait PlanStore: Send + Sync {
    /// All plans for a task whose scheduled date lies in the window.
    async fn plans_for_task(
        &self,
        task_id: &str,
        window: &DateWindow,
    ) -> Result<Vec<ExecutionPlan>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<ExecutionPlan, StoreError>;

    async fn insert(&self, plan: ExecutionPlan) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Pending plans due at `now` (scheduled instant passed, retry backoff
    /// elapsed), ordered by priority override (desc, nulls last) then
    /// scheduled instant, limited to `limit`.
    async fn due_pending(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ExecutionPlan>, StoreError>;

    /// Atomic compare-and-set claim: `Pending` → `Executing`.
    ///
    /// The cancellation flag is checked as part of the same atomic
    /// transition; a cancel-requested pending plan becomes `Skipped` and
    /// the claim reports [`ClaimOutcome::Cancelled`].
    async fn claim(&self, id: Uuid) -> Result<ClaimOutcome, StoreError>;

    /// `Executing` → `Completed`, recording the actual execution time.
    async fn complete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// `Executing` → `Failed` (terminal). Increments the retry count and
    /// records the error message.
    async fn fail(&self, id: Uuid, error: &str) -> Result<(), StoreError>;

    /// `Executing` → `Pending` retry re-arm. Increments the retry count,
    /// records the error message, and sets the backoff due time.
    async fn rearm(
        &self,
        id: Uuid,
        next_attempt_at: Option<DateTime<Utc>>,
        error: &str,
    ) -> Result<(), StoreError>;

    /// Manual `Pending` → `Skipped`.
    async fn skip(&self, id: Uuid) -> Result<(), StoreError>;

    /// Manual `Failed` → `Pending`: re-arms a terminal failure with a
    /// fresh retry budget.
    async fn manual_retry(&self, id: Uuid) -> Result<(), StoreError>;

    /// Flag a single plan for cancellation. A pending flagged plan will be
    /// skipped at claim time instead of firing.
    async fn request_cancel(&self, id: Uuid) -> Result<(), StoreError>;

    /// Flag every non-terminal plan of a task for cancellation (task
    /// deletion). Returns the number of plans flagged.
    async fn cancel_task(&self, task_id: &str) -> Result<u64, StoreError>;

    /// Paged listing for history views, optionally filtered by status.
    async fn list(
        &self,
        task_id: &str,
        window: &DateWindow,
        status: Option<PlanStatus>,
        page: u32,
        page_size: u32,
    ) -> Result<PlanPage, StoreError>;
}

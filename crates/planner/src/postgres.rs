//! PostgreSQL-backed plan store.
//!
//! The claim is a conditional `UPDATE ... WHERE status = 'pending'`;
//! PostgreSQL row locking makes the check-and-set atomic across worker
//! replicas without advisory locks or transactions.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use cadence_core::config::PostgresConfig;
use cadence_core::plan::{ExecutionPlan, PlanStatus};
use cadence_core::window::DateWindow;

use crate::store::{ClaimOutcome, PlanPage, PlanStore, StoreError};

/// Create a PostgreSQL connection pool and run migrations.
pub async fn connect_pg(config: &PostgresConfig) -> Result<PgPool, StoreError> {
    let pool = PgPool::connect(&config.database_url()).await?;
    info!(host = %config.host, "PostgreSQL connected");
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(sqlx::Error::from)?;
    info!("database migrations applied");
    Ok(pool)
}

#[derive(Debug, FromRow)]
struct PlanRow {
    id: Uuid,
    task_id: String,
    scheduled_date: NaiveDate,
    scheduled_time: NaiveTime,
    status: String,
    generated_at: DateTime<Utc>,
    next_attempt_at: Option<DateTime<Utc>>,
    actual_execution_time: Option<DateTime<Utc>>,
    error_message: Option<String>,
    retry_count: i32,
    priority_override: Option<i32>,
    cancel_requested: bool,
}

impl TryFrom<PlanRow> for ExecutionPlan {
    type Error = StoreError;

    fn try_from(row: PlanRow) -> Result<Self, StoreError> {
        let status =
            PlanStatus::parse(&row.status).ok_or_else(|| StoreError::InvalidStatus(row.status))?;
        Ok(ExecutionPlan {
            id: row.id,
            task_id: row.task_id,
            scheduled_date: row.scheduled_date,
            scheduled_time: row.scheduled_time,
            status,
            generated_at: row.generated_at,
            next_attempt_at: row.next_attempt_at,
            actual_execution_time: row.actual_execution_time,
            error_message: row.error_message,
            retry_count: row.retry_count.max(0) as u32,
            priority_override: row.priority_override,
            cancel_requested: row.cancel_requested,
        })
    }
}

const PLAN_COLUMNS: &str = "id, task_id, scheduled_date, scheduled_time, status, generated_at, \
     next_attempt_at, actual_execution_time, error_message, retry_count, \
     priority_override, cancel_requested";

/// Plan store backed by the `execution_plans` table.
#[derive(Debug, Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PlanStore for PgPlanStore {
    async fn plans_for_task(
        &self,
        task_id: &str,
        window: &DateWindow,
    ) -> Result<Vec<ExecutionPlan>, StoreError> {
        let rows: Vec<PlanRow> = sqlx::query_as(&format!(
            "SELECT {PLAN_COLUMNS} FROM execution_plans \
             WHERE task_id = $1 AND scheduled_date BETWEEN $2 AND $3 \
             ORDER BY scheduled_date, scheduled_time"
        ))
        .bind(task_id)
        .bind(window.from())
        .bind(window.to())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ExecutionPlan::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> Result<ExecutionPlan, StoreError> {
        let row: Option<PlanRow> =
            sqlx::query_as(&format!("SELECT {PLAN_COLUMNS} FROM execution_plans WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or(StoreError::NotFound(id))?.try_into()
    }

    async fn insert(&self, plan: ExecutionPlan) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO execution_plans \
             (id, task_id, scheduled_date, scheduled_time, status, generated_at, \
              next_attempt_at, actual_execution_time, error_message, retry_count, \
              priority_override, cancel_requested) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(plan.id)
        .bind(&plan.task_id)
        .bind(plan.scheduled_date)
        .bind(plan.scheduled_time)
        .bind(plan.status.as_str())
        .bind(plan.generated_at)
        .bind(plan.next_attempt_at)
        .bind(plan.actual_execution_time)
        .bind(&plan.error_message)
        .bind(plan.retry_count as i32)
        .bind(plan.priority_override)
        .bind(plan.cancel_requested)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM execution_plans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn due_pending(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ExecutionPlan>, StoreError> {
        let rows: Vec<PlanRow> = sqlx::query_as(&format!(
            "SELECT {PLAN_COLUMNS} FROM execution_plans \
             WHERE status = 'pending' \
               AND (scheduled_date + scheduled_time) <= $1 \
               AND (next_attempt_at IS NULL OR next_attempt_at <= $2) \
             ORDER BY priority_override DESC NULLS LAST, \
                      scheduled_date, scheduled_time \
             LIMIT $3"
        ))
        .bind(now.naive_utc())
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ExecutionPlan::try_from).collect()
    }

    async fn claim(&self, id: Uuid) -> Result<ClaimOutcome, StoreError> {
        // Cancelled plans are skipped in the same conditional update family,
        // so a cancel request that lands before the claim always wins.
        let skipped = sqlx::query(
            "UPDATE execution_plans SET status = 'skipped' \
             WHERE id = $1 AND status = 'pending' AND cancel_requested",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if skipped.rows_affected() > 0 {
            return Ok(ClaimOutcome::Cancelled);
        }

        let row: Option<PlanRow> = sqlx::query_as(&format!(
            "UPDATE execution_plans SET status = 'executing' \
             WHERE id = $1 AND status = 'pending' AND NOT cancel_requested \
             RETURNING {PLAN_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(ClaimOutcome::Claimed(row.try_into()?)),
            None => Ok(ClaimOutcome::Lost),
        }
    }

    async fn complete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE execution_plans \
             SET status = 'completed', actual_execution_time = $2 \
             WHERE id = $1 AND status = 'executing'",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE execution_plans \
             SET status = 'failed', retry_count = retry_count + 1, error_message = $2 \
             WHERE id = $1 AND status = 'executing'",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn rearm(
        &self,
        id: Uuid,
        next_attempt_at: Option<DateTime<Utc>>,
        error: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE execution_plans \
             SET status = 'pending', retry_count = retry_count + 1, \
                 error_message = $2, next_attempt_at = $3 \
             WHERE id = $1 AND status = 'executing'",
        )
        .bind(id)
        .bind(error)
        .bind(next_attempt_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn skip(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE execution_plans SET status = 'skipped' \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn manual_retry(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE execution_plans \
             SET status = 'pending', retry_count = 0, next_attempt_at = NULL, \
                 cancel_requested = FALSE \
             WHERE id = $1 AND status = 'failed'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn request_cancel(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE execution_plans SET cancel_requested = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn cancel_task(&self, task_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE execution_plans SET cancel_requested = TRUE \
             WHERE task_id = $1 AND status NOT IN ('completed', 'failed', 'skipped')",
        )
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list(
        &self,
        task_id: &str,
        window: &DateWindow,
        status: Option<PlanStatus>,
        page: u32,
        page_size: u32,
    ) -> Result<PlanPage, StoreError> {
        let status_str = status.map(|s| s.as_str());

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM execution_plans \
             WHERE task_id = $1 AND scheduled_date BETWEEN $2 AND $3 \
               AND ($4::text IS NULL OR status = $4)",
        )
        .bind(task_id)
        .bind(window.from())
        .bind(window.to())
        .bind(status_str)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<PlanRow> = sqlx::query_as(&format!(
            "SELECT {PLAN_COLUMNS} FROM execution_plans \
             WHERE task_id = $1 AND scheduled_date BETWEEN $2 AND $3 \
               AND ($4::text IS NULL OR status = $4) \
             ORDER BY scheduled_date, scheduled_time \
             LIMIT $5 OFFSET $6"
        ))
        .bind(task_id)
        .bind(window.from())
        .bind(window.to())
        .bind(status_str)
        .bind(page_size as i64)
        .bind(page as i64 * page_size as i64)
        .fetch_all(&self.pool)
        .await?;

        let plans = rows
            .into_iter()
            .map(ExecutionPlan::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PlanPage {
            plans,
            total: total.max(0) as u64,
        })
    }
}

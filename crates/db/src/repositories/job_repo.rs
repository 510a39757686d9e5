//! Repository for the `jobs` table.
//!
//! Every lifecycle transition is a conditional `UPDATE` guarded by the
//! expected current status, mirroring `JobState::can_transition_to`, so no
//! edge can be skipped even when two callers race. Each transition stamps
//! its own timestamp column.

use fieldline_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::job::{Job, NewJob};
use crate::models::status::{JobState, OfferStatus};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, appliance, address, amount_minor, status_id, dispatch_round, \
    offered_at, claimed_at, started_at, completed_at, cancelled_at, \
    created_at, updated_at";

/// Provides creation and lifecycle transitions for jobs.
pub struct JobRepo;

impl JobRepo {
    /// Register a new job in `pending_assignment`.
    pub async fn create(pool: &PgPool, input: &NewJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (appliance, address, amount_minor, status_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(&input.appliance)
            .bind(&input.address)
            .bind(input.amount_minor)
            .bind(JobState::PendingAssignment.id())
            .fetch_one(pool)
            .await
    }

    /// Take the job's row lock for the remainder of the transaction.
    ///
    /// Every writer that touches a job together with its offers locks the
    /// job row first (accept does it here, cancellation through
    /// `mark_cancelled`), so concurrent sibling accepts queue on the job
    /// instead of deadlocking across offer rows. Returns `false` when the
    /// job does not exist.
    pub async fn lock_row(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query_scalar::<_, DbId>("SELECT id FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(job_id)
            .fetch_optional(executor)
            .await?;
        Ok(row.is_some())
    }

    /// Find a job by its ID.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// `pending_assignment -> offered`. Owned by the dispatcher.
    ///
    /// Bumps `dispatch_round` so each re-dispatch widens the candidate
    /// fan-out. Returns the updated row, or `None` if the job was no longer
    /// in `pending_assignment`.
    pub async fn mark_offered(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, dispatch_round = dispatch_round + 1, \
                 offered_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .bind(JobState::Offered.id())
            .bind(JobState::PendingAssignment.id())
            .fetch_optional(executor)
            .await
    }

    /// `offered -> claimed`. Owned by the claim arbiter.
    ///
    /// Returns the updated row, or `None` when the job was no longer in
    /// `offered` (e.g. cancelled between accept and here).
    pub async fn mark_claimed(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, claimed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .bind(JobState::Claimed.id())
            .bind(JobState::Offered.id())
            .fetch_optional(executor)
            .await
    }

    /// `claimed -> in_progress`. Driven by the execution collaborator via
    /// `POST /jobs/{id}/start`.
    pub async fn mark_started(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(job_id)
        .bind(JobState::InProgress.id())
        .bind(JobState::Claimed.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `in_progress -> completed`.
    pub async fn mark_completed(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(job_id)
        .bind(JobState::Completed.id())
        .bind(JobState::InProgress.id())
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `any non-terminal -> cancelled`. Triggered externally.
    pub async fn mark_cancelled(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, cancelled_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id NOT IN ($3, $4)",
        )
        .bind(job_id)
        .bind(JobState::Cancelled.id())
        .bind(JobState::Completed.id())
        .bind(JobState::Cancelled.id())
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Return every `offered` job with zero remaining pending offers to
    /// `pending_assignment`, so the dispatcher can try again.
    ///
    /// This is the safety net for jobs whose offers all expired or were
    /// rejected; without it a fully unanswered fan-out would strand the job.
    pub async fn requeue_orphaned(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "UPDATE jobs \
             SET status_id = $1, updated_at = NOW() \
             WHERE status_id = $2 \
               AND NOT EXISTS ( \
                   SELECT 1 FROM offers \
                   WHERE offers.job_id = jobs.id AND offers.status_id = $3 \
               ) \
             RETURNING id",
        )
        .bind(JobState::PendingAssignment.id())
        .bind(JobState::Offered.id())
        .bind(OfferStatus::Pending.id())
        .fetch_all(pool)
        .await
    }

    /// Every job currently awaiting dispatch, oldest first.
    ///
    /// Swept by the reconciler so a job left in `pending_assignment` by an
    /// empty candidate set (or a crashed dispatch call) is retried instead
    /// of stranded.
    pub async fn list_pending_assignment(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM jobs WHERE status_id = $1 ORDER BY created_at",
        )
        .bind(JobState::PendingAssignment.id())
        .fetch_all(pool)
        .await
    }
}

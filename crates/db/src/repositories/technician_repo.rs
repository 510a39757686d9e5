//! Repository for the `technicians` table.
//!
//! Availability is mutated by two independent actors: the technician's
//! manual toggle and the claim arbiter's automatic busy-lock. The lock
//! always wins -- both [`TechnicianRepo::set_availability`] and
//! [`TechnicianRepo::lock_busy`] are compare-and-swap updates guarded by
//! `busy_offer_id`, never last-writer-wins on a shared boolean.

use fieldline_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::status::OfferStatus;
use crate::models::technician::Technician;

/// Column list for `technicians` queries.
const COLUMNS: &str = "\
    id, display_name, available, busy_offer_id, push_alive, \
    last_heartbeat_at, created_at, updated_at";

/// Provides availability, busy-lock, and session bookkeeping operations.
pub struct TechnicianRepo;

impl TechnicianRepo {
    /// Register a technician (starts unavailable).
    pub async fn register(pool: &PgPool, display_name: &str) -> Result<Technician, sqlx::Error> {
        let query = format!(
            "INSERT INTO technicians (display_name) VALUES ($1) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Technician>(&query)
            .bind(display_name)
            .fetch_one(pool)
            .await
    }

    /// Find a technician by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Technician>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM technicians WHERE id = $1");
        sqlx::query_as::<_, Technician>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Candidate set for a job: available, not busy-locked, and never
    /// offered this job before (an unanswered technician is not retried).
    ///
    /// Returned in id order; the dispatcher applies its ranking strategy
    /// on top.
    pub async fn candidates(pool: &PgPool, job_id: DbId) -> Result<Vec<Technician>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM technicians \
             WHERE available = TRUE \
               AND busy_offer_id IS NULL \
               AND NOT EXISTS ( \
                   SELECT 1 FROM offers \
                   WHERE offers.job_id = $1 \
                     AND offers.technician_id = technicians.id \
               ) \
             ORDER BY id"
        );
        sqlx::query_as::<_, Technician>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// Manual availability toggle.
    ///
    /// Refused (zero rows) while the busy-lock is held, so stale client
    /// state can never flip a technician mid-job.
    pub async fn set_availability(
        pool: &PgPool,
        id: DbId,
        available: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE technicians \
             SET available = $2, updated_at = NOW() \
             WHERE id = $1 AND busy_offer_id IS NULL",
        )
        .bind(id)
        .bind(available)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Engage the busy-lock for an accepted offer.
    ///
    /// Compare-and-swap on `busy_offer_id IS NULL`; a technician already
    /// holding an accepted offer cannot acquire a second one.
    pub async fn lock_busy(
        executor: impl PgExecutor<'_>,
        technician_id: DbId,
        offer_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE technicians \
             SET busy_offer_id = $2, updated_at = NOW() \
             WHERE id = $1 AND busy_offer_id IS NULL",
        )
        .bind(technician_id)
        .bind(offer_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Release the busy-lock held for the given offer (completion or
    /// cancellation of the underlying job).
    pub async fn release_busy_by_offer(
        executor: impl PgExecutor<'_>,
        offer_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE technicians \
             SET busy_offer_id = NULL, updated_at = NOW() \
             WHERE busy_offer_id = $1",
        )
        .bind(offer_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a live-session heartbeat (WebSocket Pong or connect).
    pub async fn heartbeat(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE technicians \
             SET push_alive = TRUE, last_heartbeat_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Drop `push_alive` for the technician (explicit disconnect).
    pub async fn mark_push_dead(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE technicians SET push_alive = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark every silently-dead push session: `push_alive` still set but no
    /// heartbeat within the grace period. Availability is untouched -- the
    /// technician simply degrades to poll-only delivery.
    pub async fn mark_stale_sessions_dead(
        pool: &PgPool,
        grace_secs: i64,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "UPDATE technicians \
             SET push_alive = FALSE, updated_at = NOW() \
             WHERE push_alive = TRUE \
               AND (last_heartbeat_at IS NULL \
                    OR last_heartbeat_at < NOW() - make_interval(secs => $1)) \
             RETURNING id",
        )
        .bind(grace_secs as f64)
        .fetch_all(pool)
        .await
    }

    /// The technician currently assigned to a job (via its accepted offer).
    pub async fn find_assigned_to_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT technician_id FROM offers WHERE job_id = $1 AND status_id = $2",
        )
        .bind(job_id)
        .bind(OfferStatus::Accepted.id())
        .fetch_optional(pool)
        .await
    }
}

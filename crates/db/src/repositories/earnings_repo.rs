//! Repository for the `earnings_records` table.
//!
//! One insert per job, taken inside the claim transaction; the only later
//! mutation is flipping `finalized` at completion. The commission percent
//! is stored as snapshotted -- it is never re-read from configuration.

use fieldline_core::earnings::EarningsSplit;
use fieldline_core::types::{DbId, MinorUnits};
use sqlx::{PgExecutor, PgPool};

use crate::models::earnings::EarningsRecord;

/// Column list for `earnings_records` queries.
const COLUMNS: &str = "\
    id, job_id, technician_id, amount_minor, commission_percent, \
    commission_minor, net_minor, finalized, created_at";

/// Provides the earnings snapshot lifecycle.
pub struct EarningsRepo;

impl EarningsRepo {
    /// Record the split computed at claim time.
    ///
    /// The unique index on `job_id` makes a double snapshot impossible.
    pub async fn snapshot(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
        technician_id: DbId,
        amount_minor: MinorUnits,
        commission_percent: u8,
        split: EarningsSplit,
    ) -> Result<EarningsRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO earnings_records \
                 (job_id, technician_id, amount_minor, commission_percent, \
                  commission_minor, net_minor) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EarningsRecord>(&query)
            .bind(job_id)
            .bind(technician_id)
            .bind(amount_minor)
            .bind(commission_percent as i16)
            .bind(split.commission_minor)
            .bind(split.net_minor)
            .fetch_one(executor)
            .await
    }

    /// Finalize the snapshot when the job completes.
    pub async fn finalize(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE earnings_records SET finalized = TRUE \
             WHERE job_id = $1 AND finalized = FALSE",
        )
        .bind(job_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The earnings snapshot for a job, if one has been taken.
    pub async fn find_by_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Option<EarningsRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM earnings_records WHERE job_id = $1");
        sqlx::query_as::<_, EarningsRecord>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }
}

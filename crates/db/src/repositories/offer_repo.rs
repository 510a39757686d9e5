//! Repository for the `offers` table.
//!
//! The accept path is the single place in the system that requires
//! serialization: [`OfferRepo::try_accept`] is one conditional `UPDATE`
//! (compare-and-swap on status + deadline), so under concurrent accepts the
//! store's row lock decides the winner and every loser matches zero rows.

use fieldline_core::types::{DbId, Timestamp};
use sqlx::{PgExecutor, PgPool};

use crate::models::offer::Offer;
use crate::models::status::OfferStatus;

/// Column list for `offers` queries.
const COLUMNS: &str = "\
    id, job_id, technician_id, status_id, deadline, \
    reject_reason, resolved_at, created_at";

/// Provides creation and resolution operations for offers.
///
/// Offers are insert-and-update only; nothing here deletes rows.
pub struct OfferRepo;

impl OfferRepo {
    /// Create a pending offer with the given deadline.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
        technician_id: DbId,
        deadline: Timestamp,
    ) -> Result<Offer, sqlx::Error> {
        let query = format!(
            "INSERT INTO offers (job_id, technician_id, status_id, deadline) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Offer>(&query)
            .bind(job_id)
            .bind(technician_id)
            .bind(OfferStatus::Pending.id())
            .bind(deadline)
            .fetch_one(executor)
            .await
    }

    /// Find an offer by its ID.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Offer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM offers WHERE id = $1");
        sqlx::query_as::<_, Offer>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Atomically accept an offer.
    ///
    /// Succeeds only if the offer is still `pending` and its deadline has
    /// not passed; returns `None` when the conditional update matched
    /// nothing, i.e. the caller lost the race or the offer went stale.
    /// Must never be split into a read followed by a write.
    pub async fn try_accept(
        executor: impl PgExecutor<'_>,
        offer_id: DbId,
    ) -> Result<Option<Offer>, sqlx::Error> {
        let query = format!(
            "UPDATE offers \
             SET status_id = $2, resolved_at = NOW() \
             WHERE id = $1 AND status_id = $3 AND deadline > NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Offer>(&query)
            .bind(offer_id)
            .bind(OfferStatus::Accepted.id())
            .bind(OfferStatus::Pending.id())
            .fetch_optional(executor)
            .await
    }

    /// Mark an offer rejected if it is still pending and within deadline.
    ///
    /// Does not touch sibling offers. Returns `None` when the offer was
    /// already resolved (or stale), which callers report exactly like a
    /// lost accept race.
    pub async fn reject(
        pool: &PgPool,
        offer_id: DbId,
        reason: Option<&str>,
    ) -> Result<Option<Offer>, sqlx::Error> {
        let query = format!(
            "UPDATE offers \
             SET status_id = $2, reject_reason = $3, resolved_at = NOW() \
             WHERE id = $1 AND status_id = $4 AND deadline > NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Offer>(&query)
            .bind(offer_id)
            .bind(OfferStatus::Rejected.id())
            .bind(reason)
            .bind(OfferStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Supersede every pending sibling of an accepted offer.
    ///
    /// Returns the superseded rows so the caller can emit one
    /// `job_superseded` event per losing technician.
    pub async fn supersede_siblings(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
        winner_offer_id: DbId,
    ) -> Result<Vec<Offer>, sqlx::Error> {
        let query = format!(
            "UPDATE offers \
             SET status_id = $3, resolved_at = NOW() \
             WHERE job_id = $1 AND id <> $2 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Offer>(&query)
            .bind(job_id)
            .bind(winner_offer_id)
            .bind(OfferStatus::Superseded.id())
            .bind(OfferStatus::Pending.id())
            .fetch_all(executor)
            .await
    }

    /// Supersede every pending offer of a job (cancellation path).
    pub async fn supersede_pending_for_job(
        executor: impl PgExecutor<'_>,
        job_id: DbId,
    ) -> Result<Vec<Offer>, sqlx::Error> {
        let query = format!(
            "UPDATE offers \
             SET status_id = $2, resolved_at = NOW() \
             WHERE job_id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Offer>(&query)
            .bind(job_id)
            .bind(OfferStatus::Superseded.id())
            .bind(OfferStatus::Pending.id())
            .fetch_all(executor)
            .await
    }

    /// Expire every pending offer whose deadline has passed.
    ///
    /// Run by the reconciliation sweep inside a transaction so the
    /// matching `job_expired` delivery-log rows commit together with the
    /// expiry. Returns the expired rows.
    pub async fn expire_due(executor: impl PgExecutor<'_>) -> Result<Vec<Offer>, sqlx::Error> {
        let query = format!(
            "UPDATE offers \
             SET status_id = $1, resolved_at = NOW() \
             WHERE status_id = $2 AND deadline <= NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Offer>(&query)
            .bind(OfferStatus::Expired.id())
            .bind(OfferStatus::Pending.id())
            .fetch_all(executor)
            .await
    }

    /// The accepted offer for a job, if any.
    ///
    /// The partial unique index guarantees at most one row can match.
    pub async fn find_accepted_for_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Option<Offer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM offers WHERE job_id = $1 AND status_id = $2"
        );
        sqlx::query_as::<_, Offer>(&query)
            .bind(job_id)
            .bind(OfferStatus::Accepted.id())
            .fetch_optional(pool)
            .await
    }

    /// All offers ever created for a job, oldest first.
    pub async fn list_for_job(pool: &PgPool, job_id: DbId) -> Result<Vec<Offer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM offers WHERE job_id = $1 ORDER BY id");
        sqlx::query_as::<_, Offer>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}

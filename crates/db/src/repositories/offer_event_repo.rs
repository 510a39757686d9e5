//! Repository for the append-only `offer_events` delivery log.
//!
//! The log is the poll endpoint's source of truth. Rows are written in the
//! same transaction as the state change they describe, so a committed
//! transition is always pollable even when the push never arrived.

use fieldline_core::types::DbId;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::offer_event::OfferEventRow;

/// Column list for `offer_events` queries.
const COLUMNS: &str = "id, technician_id, event_id, body, created_at";

/// Maximum rows returned per poll.
const POLL_LIMIT: i64 = 200;

/// Provides append and cursor-read operations for the delivery log.
pub struct OfferEventRepo;

impl OfferEventRepo {
    /// Append an event for a technician. Returns the new row id (cursor
    /// position of the event).
    pub async fn append(
        executor: impl PgExecutor<'_>,
        technician_id: DbId,
        event_id: Uuid,
        body: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO offer_events (technician_id, event_id, body) \
             VALUES ($1, $2, $3) \
             RETURNING id",
        )
        .bind(technician_id)
        .bind(event_id)
        .bind(body)
        .fetch_one(executor)
        .await
    }

    /// Read every event for a technician with row id greater than `cursor`,
    /// oldest first, deduplicated by `event_id` (first occurrence wins).
    ///
    /// Pure read -- calling it repeatedly with the same cursor returns the
    /// same rows. The caller derives the next cursor from the last row id,
    /// falling back to the request cursor when nothing is returned.
    pub async fn list_since(
        pool: &PgPool,
        technician_id: DbId,
        cursor: DbId,
    ) -> Result<Vec<OfferEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM offer_events \
             WHERE technician_id = $1 AND id > $2 \
             ORDER BY id \
             LIMIT $3"
        );
        let rows = sqlx::query_as::<_, OfferEventRow>(&query)
            .bind(technician_id)
            .bind(cursor.max(0))
            .bind(POLL_LIMIT)
            .fetch_all(pool)
            .await?;

        // Dedup by event_id while preserving id order.
        let mut seen = std::collections::HashSet::with_capacity(rows.len());
        Ok(rows
            .into_iter()
            .filter(|row| seen.insert(row.event_id))
            .collect())
    }
}

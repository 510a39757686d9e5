//! Rows of the append-only delivery log backing the poll endpoint.

use fieldline_core::types::{DbId, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `offer_events` table.
///
/// `id` is the poll cursor; `event_id` is the client-side dedup key shared
/// between the push and poll representations of the same event.
#[derive(Debug, Clone, FromRow)]
pub struct OfferEventRow {
    pub id: DbId,
    pub technician_id: DbId,
    pub event_id: Uuid,
    pub body: serde_json::Value,
    pub created_at: Timestamp,
}

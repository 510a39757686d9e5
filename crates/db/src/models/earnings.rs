//! Earnings snapshot models.

use fieldline_core::types::{DbId, MinorUnits, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `earnings_records` table.
///
/// Created exactly once per job at claim time with the commission percent
/// in effect at that instant; `finalized` flips when the job completes.
/// The row is otherwise immutable.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EarningsRecord {
    pub id: DbId,
    pub job_id: DbId,
    pub technician_id: DbId,
    pub amount_minor: MinorUnits,
    pub commission_percent: i16,
    pub commission_minor: MinorUnits,
    pub net_minor: MinorUnits,
    pub finalized: bool,
    pub created_at: Timestamp,
}

//! Offer entity models.

use fieldline_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `offers` table.
///
/// Offers are never deleted; every resolution (accept, reject, expire,
/// supersede) is recorded in place for audit and earnings history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Offer {
    pub id: DbId,
    pub job_id: DbId,
    pub technician_id: DbId,
    pub status_id: StatusId,
    pub deadline: Timestamp,
    pub reject_reason: Option<String>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Optional body for `POST /api/v1/offers/{id}/reject`.
#[derive(Debug, Default, Deserialize)]
pub struct RejectOffer {
    pub reason: Option<String>,
}

//! Job entity models and DTOs for the dispatch core.

use fieldline_core::types::{DbId, MinorUnits, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub appliance: String,
    pub address: String,
    pub amount_minor: MinorUnits,
    pub status_id: StatusId,
    pub dispatch_round: i32,
    pub offered_at: Option<Timestamp>,
    pub claimed_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a new job via `POST /api/v1/jobs` (booking intake).
#[derive(Debug, Deserialize)]
pub struct NewJob {
    pub appliance: String,
    pub address: String,
    pub amount_minor: MinorUnits,
}

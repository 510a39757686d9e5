//! Technician entity models and availability DTOs.

use fieldline_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `technicians` table.
///
/// `busy_offer_id` is the automatic busy-lock: while it is set the
/// technician receives no new offers and cannot toggle availability.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Technician {
    pub id: DbId,
    pub display_name: String,
    pub available: bool,
    pub busy_offer_id: Option<DbId>,
    pub push_alive: bool,
    pub last_heartbeat_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Body for `POST /api/v1/technicians/{id}/availability`.
#[derive(Debug, Deserialize)]
pub struct SetAvailability {
    pub available: bool,
}

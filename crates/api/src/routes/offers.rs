//! Technician-facing offer endpoints: poll, accept, reject.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use fieldline_core::types::DbId;
use fieldline_db::models::offer::{Offer, RejectOffer};
use fieldline_db::repositories::OfferEventRepo;
use serde::{Deserialize, Serialize};

use crate::engine::ClaimOutcome;
use crate::error::AppResult;
use crate::middleware::auth::AuthTechnician;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    /// Cursor from the previous poll; omit (or 0) for the full backlog.
    #[serde(default)]
    pub since: DbId,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    /// Events newer than the cursor, oldest first, deduplicated.
    pub events: Vec<serde_json::Value>,
    /// Cursor to pass as `since` on the next poll. Unchanged when no new
    /// events arrived.
    pub cursor: DbId,
}

/// How an accept/reject attempt resolved, as reported to the client.
///
/// A lost race is `already_resolved` with HTTP 200; the client retracts
/// its local alert exactly as if a supersede event had arrived.
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ClaimResponse {
    Accepted {
        offer: Offer,
        job: fieldline_db::models::job::Job,
    },
    Rejected {
        offer: Offer,
    },
    AlreadyResolved,
}

impl From<ClaimOutcome> for ClaimResponse {
    fn from(outcome: ClaimOutcome) -> Self {
        match outcome {
            ClaimOutcome::Accepted { offer, job } => ClaimResponse::Accepted { offer, job },
            ClaimOutcome::Rejected { offer } => ClaimResponse::Rejected { offer },
            ClaimOutcome::AlreadyResolved => ClaimResponse::AlreadyResolved,
        }
    }
}

/// GET /offers?since={cursor} -- the reliable delivery channel.
///
/// Returns the caller's offer events after the cursor. Safe to call
/// repeatedly; the same cursor always yields the same events.
async fn poll_offers(
    auth: AuthTechnician,
    State(state): State<AppState>,
    Query(query): Query<PollQuery>,
) -> AppResult<Json<DataResponse<PollResponse>>> {
    let rows = OfferEventRepo::list_since(&state.pool, auth.technician_id, query.since).await?;
    let cursor = rows.last().map(|row| row.id).unwrap_or(query.since);
    let events = rows.into_iter().map(|row| row.body).collect();

    Ok(Json(DataResponse {
        data: PollResponse { events, cursor },
    }))
}

/// POST /offers/{id}/accept -- attempt to claim the job.
async fn accept_offer(
    auth: AuthTechnician,
    State(state): State<AppState>,
    Path(offer_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ClaimResponse>>> {
    let outcome = state.arbiter.accept(auth.technician_id, offer_id).await?;
    Ok(Json(DataResponse {
        data: outcome.into(),
    }))
}

/// POST /offers/{id}/reject -- decline the offer (body optional).
async fn reject_offer(
    auth: AuthTechnician,
    State(state): State<AppState>,
    Path(offer_id): Path<DbId>,
    body: Option<Json<RejectOffer>>,
) -> AppResult<Json<DataResponse<ClaimResponse>>> {
    let reason = body.as_ref().and_then(|b| b.reason.as_deref());
    let outcome = state
        .arbiter
        .reject(auth.technician_id, offer_id, reason)
        .await?;
    Ok(Json(DataResponse {
        data: outcome.into(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/offers", get(poll_offers))
        .route("/offers/{id}/accept", post(accept_offer))
        .route("/offers/{id}/reject", post(reject_offer))
}

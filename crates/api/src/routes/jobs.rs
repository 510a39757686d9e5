//! Job intake and lifecycle endpoints.
//!
//! Intake and cancellation come from the booking side of the deployment
//! and are unauthenticated within the service boundary; start and
//! complete are driven by the assigned technician.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use fieldline_core::error::CoreError;
use fieldline_core::types::DbId;
use fieldline_db::models::earnings::EarningsRecord;
use fieldline_db::models::job::{Job, NewJob};
use fieldline_db::models::offer::Offer;
use fieldline_db::repositories::{EarningsRepo, JobRepo, OfferRepo};

use crate::engine::lifecycle;
use crate::engine::DispatchError;
use crate::error::AppResult;
use crate::middleware::auth::AuthTechnician;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /jobs -- booking intake.
///
/// The job is registered and a first dispatch round is attempted
/// immediately. An empty candidate set is not an error; the job stays
/// queued and the reconciliation sweep retries.
async fn create_job(
    State(state): State<AppState>,
    Json(body): Json<NewJob>,
) -> AppResult<(StatusCode, Json<DataResponse<Job>>)> {
    if body.amount_minor <= 0 {
        return Err(CoreError::Validation("amount_minor must be positive".into()).into());
    }
    if body.appliance.trim().is_empty() || body.address.trim().is_empty() {
        return Err(CoreError::Validation("appliance and address are required".into()).into());
    }

    let job = JobRepo::create(&state.pool, &body).await?;

    match state.dispatcher.dispatch(job.id).await {
        Ok(_) | Err(DispatchError::NoCandidates(_)) | Err(DispatchError::NotEligible(_)) => {}
        Err(e) => {
            tracing::error!(job_id = job.id, error = %e, "Initial dispatch failed");
        }
    }

    // Re-read so the response reflects the dispatch round, if one ran.
    let job = JobRepo::find_by_id(&state.pool, job.id)
        .await?
        .unwrap_or(job);
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

/// GET /jobs/{id}
async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        })?;
    Ok(Json(DataResponse { data: job }))
}

/// GET /jobs/{id}/offers -- audit view of every offer round.
async fn list_job_offers(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Offer>>>> {
    JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        })?;
    let offers = OfferRepo::list_for_job(&state.pool, job_id).await?;
    Ok(Json(DataResponse { data: offers }))
}

/// GET /jobs/{id}/earnings -- the snapshot taken at claim time.
async fn get_job_earnings(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Json<DataResponse<EarningsRecord>>> {
    let record = EarningsRepo::find_by_job(&state.pool, job_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "EarningsRecord",
            id: job_id,
        })?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /jobs/{id}/start -- assigned technician begins work.
async fn start_job(
    auth: AuthTechnician,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = lifecycle::start(&state.pool, job_id, auth.technician_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /jobs/{id}/complete -- assigned technician finishes work.
async fn complete_job(
    auth: AuthTechnician,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = lifecycle::complete(&state.pool, job_id, auth.technician_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /jobs/{id}/cancel -- booking-side cancellation.
async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = lifecycle::cancel(&state.pool, &state.event_bus, job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/offers", get(list_job_offers))
        .route("/jobs/{id}/earnings", get(get_job_earnings))
        .route("/jobs/{id}/start", post(start_job))
        .route("/jobs/{id}/complete", post(complete_job))
        .route("/jobs/{id}/cancel", post(cancel_job))
}

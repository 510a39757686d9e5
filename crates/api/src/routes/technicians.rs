//! Technician registration, profile, and availability.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use fieldline_core::error::CoreError;
use fieldline_core::types::DbId;
use fieldline_db::models::technician::{SetAvailability, Technician};
use fieldline_db::repositories::TechnicianRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthTechnician;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterTechnician {
    pub display_name: String,
}

/// POST /technicians -- operator-side registration. New technicians start
/// unavailable and toggle themselves on once their client is set up.
async fn register_technician(
    State(state): State<AppState>,
    Json(body): Json<RegisterTechnician>,
) -> AppResult<(StatusCode, Json<DataResponse<Technician>>)> {
    if body.display_name.trim().is_empty() {
        return Err(CoreError::Validation("display_name is required".into()).into());
    }
    let technician = TechnicianRepo::register(&state.pool, body.display_name.trim()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: technician })))
}

/// GET /technicians/me
async fn get_me(
    auth: AuthTechnician,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Technician>>> {
    let technician = TechnicianRepo::find_by_id(&state.pool, auth.technician_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Technician",
            id: auth.technician_id,
        })?;
    Ok(Json(DataResponse { data: technician }))
}

/// POST /technicians/{id}/availability -- manual availability toggle.
///
/// Self-only: acting on another technician's record is 403. Refused with
/// 409 while the busy-lock is engaged; the lock releases automatically
/// when the running job completes or is cancelled.
async fn set_availability(
    auth: AuthTechnician,
    State(state): State<AppState>,
    Path(technician_id): Path<DbId>,
    Json(body): Json<SetAvailability>,
) -> AppResult<Json<DataResponse<Technician>>> {
    if technician_id != auth.technician_id {
        return Err(CoreError::Forbidden(
            "Availability can only be changed for yourself".into(),
        )
        .into());
    }
    let updated =
        TechnicianRepo::set_availability(&state.pool, auth.technician_id, body.available).await?;
    if !updated {
        return Err(AppError::JobInProgress);
    }
    let technician = TechnicianRepo::find_by_id(&state.pool, auth.technician_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Technician",
            id: auth.technician_id,
        })?;
    Ok(Json(DataResponse { data: technician }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/technicians", post(register_technician))
        .route("/technicians/me", get(get_me))
        .route("/technicians/{id}/availability", post(set_availability))
}

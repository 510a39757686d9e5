//! Token minting for technician clients.
//!
//! There is no password store in this service; a deployment-level
//! provisioning key (configured as a SHA-256 digest) gates the mint
//! endpoint. When the digest is unset, minting is disabled and every
//! request is refused.

use axum::extract::State;
use axum::{routing::post, Json, Router};
use fieldline_core::error::CoreError;
use fieldline_core::types::DbId;
use fieldline_db::repositories::TechnicianRepo;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_access_token;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MintTokenRequest {
    pub provision_key: String,
    pub technician_id: DbId,
}

#[derive(Debug, Serialize)]
pub struct MintTokenResponse {
    pub token: String,
    pub expires_in_mins: i64,
}

/// POST /auth/token -- mint an access token for a registered technician.
async fn mint_token(
    State(state): State<AppState>,
    Json(body): Json<MintTokenRequest>,
) -> AppResult<Json<DataResponse<MintTokenResponse>>> {
    if !state.config.jwt.verify_provision_key(&body.provision_key) {
        return Err(CoreError::Unauthorized("Invalid provisioning key".into()).into());
    }

    TechnicianRepo::find_by_id(&state.pool, body.technician_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Technician",
            id: body.technician_id,
        })?;

    let token = generate_access_token(body.technician_id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation failed: {e}")))?;

    Ok(Json(DataResponse {
        data: MintTokenResponse {
            token,
            expires_in_mins: state.config.jwt.access_token_expiry_mins,
        },
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/token", post(mint_token))
}

pub mod auth;
pub mod health;
pub mod jobs;
pub mod offers;
pub mod technicians;

use axum::routing::get;
use axum::{Json, Router};
use fieldline_core::reconnect::ReconnectPolicy;

use crate::response::DataResponse;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                              delivery WebSocket (requires auth)
///
/// /auth/token                      mint access token (provision key)
/// /reconnect-policy                client backoff schedule (public)
///
/// /offers                          poll delivery log (requires auth)
/// /offers/{id}/accept              claim attempt (requires auth)
/// /offers/{id}/reject              decline (requires auth)
///
/// /jobs                            booking intake
/// /jobs/{id}                       job detail
/// /jobs/{id}/offers                offer audit trail
/// /jobs/{id}/earnings              earnings snapshot
/// /jobs/{id}/start                 begin work (requires auth)
/// /jobs/{id}/complete              finish work (requires auth)
/// /jobs/{id}/cancel                booking-side cancellation
///
/// /technicians                     registration
/// /technicians/me                  own profile (requires auth)
/// /technicians/{id}/availability   availability toggle (self-only)
/// ```
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/reconnect-policy", get(reconnect_policy))
        .merge(auth::router())
        .merge(offers::router())
        .merge(jobs::router())
        .merge(technicians::router())
}

/// GET /reconnect-policy -- the shared backoff schedule, served so push
/// clients cannot drift from the server's expectations.
async fn reconnect_policy() -> Json<DataResponse<ReconnectPolicy>> {
    Json(DataResponse {
        data: ReconnectPolicy::default(),
    })
}

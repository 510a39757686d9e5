use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::{ClaimArbiter, OfferDispatcher};
use crate::ws::SessionManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: fieldline_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Live delivery sessions (technician WebSocket connections).
    pub sessions: Arc<SessionManager>,
    /// Event bus feeding the push delivery task.
    pub event_bus: Arc<fieldline_events::EventBus>,
    /// The offer dispatcher (fan-out + deadline).
    pub dispatcher: Arc<OfferDispatcher>,
    /// The claim arbiter (exclusive accept/reject protocol).
    pub arbiter: Arc<ClaimArbiter>,
}

//! WebSocket infrastructure for the live delivery channel.
//!
//! Provides session management, heartbeat monitoring, and the HTTP upgrade
//! handler used by Axum routes. Push delivery over these sessions is best
//! effort; the poll endpoint is the reliable path.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::SessionManager;

use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::SessionManager;

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn a background task that sends periodic Ping frames to all connected
/// delivery sessions.
///
/// Clients answer with Pongs, which refresh the per-technician heartbeat
/// column the reconciliation sweep reads. The returned `JoinHandle` can be
/// used to abort the task during shutdown.
pub fn start_heartbeat(sessions: Arc<SessionManager>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));

        loop {
            interval.tick().await;
            let count = sessions.session_count().await;
            tracing::debug!(count, "Delivery session heartbeat ping");
            sessions.ping_all().await;
        }
    })
}

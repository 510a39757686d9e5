use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use fieldline_core::types::{DbId, Timestamp};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type SessionSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single live delivery session.
pub struct Session {
    /// The authenticated technician this session belongs to.
    pub technician_id: DbId,
    /// Channel sender for outbound messages to this connection.
    pub sender: SessionSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Manages all active delivery sessions.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Sessions exist only in memory -- a session
/// that dies silently is detected by the reconciliation sweep through the
/// heartbeat columns, not here.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionManager {
    /// Create a new, empty session manager.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new session for a technician.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(
        &self,
        conn_id: String,
        technician_id: DbId,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session {
            technician_id,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.sessions.write().await.insert(conn_id, session);
        rx
    }

    /// Remove a session by its connection ID.
    pub async fn remove(&self, conn_id: &str) {
        self.sessions.write().await.remove(conn_id);
    }

    /// Whether the technician still has at least one live session.
    pub async fn has_session(&self, technician_id: DbId) -> bool {
        self.sessions
            .read()
            .await
            .values()
            .any(|s| s.technician_id == technician_id)
    }

    /// Send a message to every session belonging to a technician.
    ///
    /// Returns the number of sessions the message was sent to. Sessions
    /// whose send channels are closed are silently skipped (they are
    /// cleaned up on their receive loop's next iteration).
    pub async fn send_to_technician(&self, technician_id: DbId, message: Message) -> usize {
        let sessions = self.sessions.read().await;
        let mut count = 0;
        for session in sessions.values() {
            if session.technician_id == technician_id {
                let _ = session.sender.send(message.clone());
                count += 1;
            }
        }
        count
    }

    /// Return the current number of active sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and surface
    /// dead ones through missing Pongs.
    pub async fn ping_all(&self) {
        let sessions = self.sessions.read().await;
        for session in sessions.values() {
            let _ = session.sender.send(Message::Ping(Bytes::new()));
        }
    }

    /// Send a Close frame to every session, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        for session in sessions.values() {
            let _ = session.sender.send(Message::Close(None));
        }
        sessions.clear();
        tracing::info!(count, "Closed all delivery sessions");
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use fieldline_core::types::DbId;
use fieldline_db::repositories::TechnicianRepo;
use futures::{SinkExt, StreamExt};

use crate::middleware::auth::AuthTechnician;
use crate::state::AppState;
use crate::ws::manager::SessionManager;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// The upgrade request carries the technician's bearer credential; after
/// the upgrade the session is registered with [`SessionManager`] and the
/// technician's push channel is marked alive.
pub async fn ws_handler(
    auth: AuthTechnician,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, auth.technician_id))
}

/// Manage a single delivery session after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the session and records a heartbeat.
///   2. Spawns a sender task forwarding messages from the manager channel.
///   3. Processes inbound frames (Pongs refresh the heartbeat).
///   4. Cleans up on disconnect, dropping `push_alive` once the last
///      session for the technician is gone.
async fn handle_socket(socket: WebSocket, state: AppState, technician_id: DbId) {
    let sessions: Arc<SessionManager> = Arc::clone(&state.sessions);
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, technician_id, "Delivery session connected");

    // Register and get the receiver for outbound messages.
    let mut rx = sessions.add(conn_id.clone(), technician_id).await;

    if let Err(e) = TechnicianRepo::heartbeat(&state.pool, technician_id).await {
        tracing::warn!(technician_id, error = %e, "Failed to record connect heartbeat");
    }

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: process inbound frames.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                if let Err(e) = TechnicianRepo::heartbeat(&state.pool, technician_id).await {
                    tracing::warn!(technician_id, error = %e, "Failed to record heartbeat");
                }
            }
            Ok(_msg) => {
                // The delivery channel is one-way; inbound text is ignored.
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove the session and abort the sender task.
    sessions.remove(&conn_id).await;
    send_task.abort();

    if !sessions.has_session(technician_id).await {
        if let Err(e) = TechnicianRepo::mark_push_dead(&state.pool, technician_id).await {
            tracing::warn!(technician_id, error = %e, "Failed to mark push session dead");
        }
    }
    tracing::info!(conn_id = %conn_id, technician_id, "Delivery session disconnected");
}

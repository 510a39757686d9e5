//! Event delivery: durable log writes plus best-effort push fan-out.
//!
//! Every committed offer event is written to the `offer_events` delivery
//! log in the same transaction as the state change it describes, then
//! published on the in-process bus. The push task forwards bus notices to
//! live WebSocket sessions; a technician with no session (or a dropped
//! frame) simply picks the event up on the next poll.

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes};
use fieldline_core::types::DbId;
use fieldline_db::repositories::OfferEventRepo;
use fieldline_events::{DeliveryNotice, EventBus, OfferEvent};
use sqlx::PgExecutor;
use tokio_util::sync::CancellationToken;

use crate::ws::SessionManager;

/// Append an event to the technician's delivery log.
///
/// Must run on the same executor (transaction) as the state change the
/// event describes, so log row and transition commit or roll back
/// together. Returns the row id, which doubles as the poll cursor
/// position of the event.
pub async fn record(
    executor: impl PgExecutor<'_>,
    technician_id: DbId,
    event: &OfferEvent,
) -> Result<DbId, sqlx::Error> {
    let body = serde_json::to_value(event)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    OfferEventRepo::append(executor, technician_id, event.event_id(), &body).await
}

/// Background task forwarding bus notices to live WebSocket sessions.
///
/// Push is best effort by design: serialization failures and dead
/// sessions are logged and skipped, and a lagged receiver just resumes
/// from the current position -- the delivery log already holds everything
/// a client could have missed.
pub async fn run_push_fanout(
    bus: Arc<EventBus>,
    sessions: Arc<SessionManager>,
    cancel: CancellationToken,
) {
    let mut rx = bus.subscribe();
    tracing::info!("Push fan-out task started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Push fan-out task shutting down");
                break;
            }
            received = rx.recv() => match received {
                Ok(DeliveryNotice { technician_id, event }) => {
                    push_to_sessions(&sessions, technician_id, &event).await;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Push fan-out lagged behind the bus");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, stopping push fan-out");
                    break;
                }
            },
        }
    }
}

async fn push_to_sessions(sessions: &SessionManager, technician_id: DbId, event: &OfferEvent) {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize offer event for push");
            return;
        }
    };
    let delivered = sessions
        .send_to_technician(technician_id, Message::Text(Utf8Bytes::from(text)))
        .await;
    if delivered == 0 {
        tracing::debug!(
            technician_id,
            event_id = %event.event_id(),
            "No live session, event waits for poll"
        );
    }
}

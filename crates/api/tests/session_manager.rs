//! Unit tests for `SessionManager`.
//!
//! These tests exercise the delivery-session manager directly, without
//! performing any HTTP upgrades. They verify add/remove semantics,
//! per-technician delivery, and graceful shutdown behaviour.

use axum::extract::ws::Message;
use fieldline_api::ws::SessionManager;

// ---------------------------------------------------------------------------
// Test: new manager starts with zero sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_manager_has_zero_sessions() {
    let manager = SessionManager::new();

    assert_eq!(manager.session_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: add() increments the session count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_increments_session_count() {
    let manager = SessionManager::new();

    let _rx = manager.add("conn-1".to_string(), 1).await;

    assert_eq!(manager.session_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: remove() decrements the session count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remove_decrements_session_count() {
    let manager = SessionManager::new();

    let _rx = manager.add("conn-1".to_string(), 1).await;
    assert_eq!(manager.session_count().await, 1);

    manager.remove("conn-1").await;
    assert_eq!(manager.session_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: remove() with unknown ID is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remove_unknown_id_is_noop() {
    let manager = SessionManager::new();

    let _rx = manager.add("conn-1".to_string(), 1).await;
    manager.remove("nonexistent").await;

    assert_eq!(manager.session_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: send_to_technician reaches every session of that technician
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_to_technician_reaches_all_their_sessions() {
    let manager = SessionManager::new();

    let mut rx_a1 = manager.add("conn-a1".to_string(), 1).await;
    let mut rx_a2 = manager.add("conn-a2".to_string(), 1).await;
    let mut rx_b = manager.add("conn-b".to_string(), 2).await;

    let delivered = manager
        .send_to_technician(1, Message::Text("offer".into()))
        .await;
    assert_eq!(delivered, 2);

    assert!(matches!(rx_a1.recv().await, Some(Message::Text(t)) if t.as_str() == "offer"));
    assert!(matches!(rx_a2.recv().await, Some(Message::Text(t)) if t.as_str() == "offer"));
    assert!(rx_b.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: send_to_technician with no sessions delivers to nobody
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_to_absent_technician_delivers_nothing() {
    let manager = SessionManager::new();

    let _rx = manager.add("conn-1".to_string(), 1).await;

    let delivered = manager
        .send_to_technician(99, Message::Text("offer".into()))
        .await;
    assert_eq!(delivered, 0);
}

// ---------------------------------------------------------------------------
// Test: has_session tracks per-technician presence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn has_session_tracks_presence() {
    let manager = SessionManager::new();

    assert!(!manager.has_session(1).await);

    let _rx1 = manager.add("conn-1".to_string(), 1).await;
    let _rx2 = manager.add("conn-2".to_string(), 1).await;
    assert!(manager.has_session(1).await);

    manager.remove("conn-1").await;
    assert!(manager.has_session(1).await, "second session still live");

    manager.remove("conn-2").await;
    assert!(!manager.has_session(1).await);
}

// ---------------------------------------------------------------------------
// Test: ping_all sends a Ping frame to every session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_all_reaches_every_session() {
    let manager = SessionManager::new();

    let mut rx1 = manager.add("conn-1".to_string(), 1).await;
    let mut rx2 = manager.add("conn-2".to_string(), 2).await;

    manager.ping_all().await;

    assert!(matches!(rx1.recv().await, Some(Message::Ping(_))));
    assert!(matches!(rx2.recv().await, Some(Message::Ping(_))));
}

// ---------------------------------------------------------------------------
// Test: shutdown_all sends Close frames and clears the map
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_closes_and_clears() {
    let manager = SessionManager::new();

    let mut rx1 = manager.add("conn-1".to_string(), 1).await;
    let mut rx2 = manager.add("conn-2".to_string(), 2).await;

    manager.shutdown_all().await;

    assert!(matches!(rx1.recv().await, Some(Message::Close(_))));
    assert!(matches!(rx2.recv().await, Some(Message::Close(_))));
    assert_eq!(manager.session_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: sending into a dropped session does not panic
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_after_receiver_dropped_is_silently_skipped() {
    let manager = SessionManager::new();

    let rx = manager.add("conn-1".to_string(), 1).await;
    drop(rx);

    // The session is still registered; the closed channel is skipped
    // without error.
    let delivered = manager
        .send_to_technician(1, Message::Text("offer".into()))
        .await;
    assert_eq!(delivered, 1);
}

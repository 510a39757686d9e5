use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fieldline_api::config::ServerConfig;
use fieldline_api::engine::{ClaimArbiter, OfferDispatcher};
use fieldline_api::router::build_app_router;
use fieldline_api::state::AppState;
use fieldline_api::{background, delivery, ws};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldline_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = fieldline_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    fieldline_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    fieldline_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Delivery sessions ---
    let sessions = Arc::new(ws::SessionManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&sessions));

    // --- Event bus and push fan-out ---
    let event_bus = Arc::new(fieldline_events::EventBus::default());
    let fanout_cancel = tokio_util::sync::CancellationToken::new();
    let fanout_handle = tokio::spawn(delivery::run_push_fanout(
        Arc::clone(&event_bus),
        Arc::clone(&sessions),
        fanout_cancel.clone(),
    ));

    // --- Dispatch engine ---
    let dispatcher = Arc::new(OfferDispatcher::new(
        pool.clone(),
        Arc::clone(&event_bus),
        config.dispatch.clone(),
    ));
    let arbiter = Arc::new(ClaimArbiter::new(
        pool.clone(),
        Arc::clone(&event_bus),
        config.dispatch.commission_percent,
    ));

    // --- Reconciliation sweep ---
    let reconciler_cancel = tokio_util::sync::CancellationToken::new();
    let reconciler_handle = tokio::spawn(background::reconciler::run_reconciler(
        pool.clone(),
        Arc::clone(&event_bus),
        Arc::clone(&dispatcher),
        config.dispatch.clone(),
        reconciler_cancel.clone(),
    ));
    tracing::info!("Dispatch engine and reconciliation sweep started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        sessions: Arc::clone(&sessions),
        event_bus: Arc::clone(&event_bus),
        dispatcher,
        arbiter,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop the reconciliation sweep before closing sessions so a final
    // in-flight pass can still publish.
    reconciler_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), reconciler_handle).await;
    tracing::info!("Reconciliation sweep stopped");

    fanout_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), fanout_handle).await;
    tracing::info!("Push fan-out stopped");

    let session_count = sessions.session_count().await;
    tracing::info!(session_count, "Closing remaining delivery sessions");
    sessions.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

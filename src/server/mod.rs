//! HTTP server module for API and WebSocket endpoints.
//!
//! Provides a REST API over the timers, ledger and reports, and a
//! WebSocket that streams timer events to frontends.

pub mod routes;
pub mod state;
pub mod ws;

use crate::server::routes::{captures, config, health, history, report, sessions, tally, timer};
use crate::server::state::AppState;
use crate::server::ws::ws_handler;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::io;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

/// Builds the router with every route and permissive CORS.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Activity timer
        .route("/api/timer", get(timer::get_timer))
        .route("/api/timer/start", post(timer::start_timer))
        .route("/api/timer/pause", post(timer::pause_timer))
        .route("/api/timer/reset", post(timer::reset_timer))
        .route("/api/status", get(timer::get_status))
        // Session timers
        .route("/api/sessions", get(sessions::get_sessions))
        .route(
            "/api/sessions/:activity_id/start",
            post(sessions::start_session),
        )
        .route(
            "/api/sessions/:activity_id/pause",
            post(sessions::pause_session),
        )
        // Reports and history
        .route("/api/report", get(report::get_report))
        .route("/api/history", get(history::get_history))
        .route("/api/history/export", get(history::export_history))
        .route("/api/history/import", post(history::import_history))
        // Tallies and captures
        .route("/api/tally", get(tally::get_tally))
        .route("/api/tally/win", post(tally::record_win))
        .route("/api/tally/loss", post(tally::record_loss))
        .route("/api/tally/reset", post(tally::reset_tally))
        .route(
            "/api/captures",
            get(captures::get_captures).post(captures::post_capture),
        )
        // Config API
        .route("/api/config", get(config::get_config))
        .route("/api/config/:key", put(config::update_config))
        // WebSocket
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on a background thread with its own runtime.
///
/// Blocks until the listener is bound, so a port that is already taken is
/// reported here rather than only in the log.
pub fn start_server(state: Arc<AppState>, port: u16) -> io::Result<JoinHandle<()>> {
    tracing::info!(port, "HTTP server starting");
    let (ready_tx, ready_rx) = mpsc::channel::<io::Result<SocketAddr>>();

    let handle = std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!(?e, "Failed to create Tokio runtime");
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        rt.block_on(run_server(state, port, ready_tx));
    });

    match ready_rx.recv() {
        Ok(Ok(addr)) => {
            tracing::info!("HTTP server listening on http://{}", addr);
            Ok(handle)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(io::Error::other("HTTP server thread exited before binding")),
    }
}

/// Binds, reports the outcome on `ready`, then serves until it fails.
async fn run_server(
    state: Arc<AppState>,
    port: u16,
    ready: mpsc::Sender<io::Result<SocketAddr>>,
) {
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(?e, %addr, "Failed to bind HTTP server");
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(listener.local_addr().unwrap_or(addr)));

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(?e, "HTTP server stopped");
    }
}

//! WebSocket handler for real-time timer updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::server::state::{envelope, AppState};

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Send current timer state on connection
    if let Some(initial_state) = initial_state(&state) {
        let _ = sender.send(Message::Text(initial_state)).await;
    }

    let mut rx = state.subscribe();

    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                // A slow client misses ticks; the next one catches it up
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "WebSocket client lagging");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    tracing::debug!("WebSocket connection closed");
}

/// Timer and session snapshots sent when a client connects.
fn initial_state(state: &AppState) -> Option<String> {
    let timer = state.timer.lock().ok()?.snapshot();
    let mut sessions: Vec<_> = state
        .sessions
        .lock()
        .ok()?
        .values()
        .map(|s| s.snapshot())
        .collect();
    sessions.sort_by(|a, b| a.activity_id.cmp(&b.activity_id));

    let data = serde_json::json!({
        "timer": timer,
        "sessions": sessions,
    });
    envelope("initial_state", &data)
}

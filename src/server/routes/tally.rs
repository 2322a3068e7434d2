//! Win/loss tally endpoints.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::server::state::AppState;
use crate::store::TallySnapshot;

/// GET /api/tally
pub async fn get_tally(State(state): State<Arc<AppState>>) -> Json<TallySnapshot> {
    Json(state.tally.snapshot())
}

/// POST /api/tally/win
pub async fn record_win(State(state): State<Arc<AppState>>) -> Json<TallySnapshot> {
    Json(state.tally.record_win())
}

/// POST /api/tally/loss
pub async fn record_loss(State(state): State<Arc<AppState>>) -> Json<TallySnapshot> {
    Json(state.tally.record_loss())
}

/// POST /api/tally/reset
pub async fn reset_tally(State(state): State<Arc<AppState>>) -> Json<TallySnapshot> {
    Json(state.tally.reset())
}

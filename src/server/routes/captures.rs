//! Quick-capture endpoints.

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResult};
use crate::server::state::AppState;
use crate::store::CaptureEntry;

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub text: String,
}

/// GET /api/captures - Newest first.
pub async fn get_captures(State(state): State<Arc<AppState>>) -> Json<Vec<CaptureEntry>> {
    Json(state.captures.entries())
}

/// POST /api/captures
pub async fn post_capture(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CaptureRequest>,
) -> ApiResult<CaptureEntry> {
    state
        .captures
        .capture(&req.text)?
        .map(Json)
        .ok_or_else(|| ApiError::bad_request("Capture text is empty"))
}

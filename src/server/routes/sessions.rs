//! Session timer endpoints.
//!
//! Session timers are created on first start and live until the process
//! exits.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{lock, ApiError, ApiResult};
use crate::server::state::AppState;
use crate::timer::{SessionSnapshot, SessionTimer};

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    pub expected_minutes: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSnapshot>,
}

/// GET /api/sessions - All session timers, sorted by activity id.
pub async fn get_sessions(State(state): State<Arc<AppState>>) -> ApiResult<SessionsResponse> {
    let sessions = lock(&state.sessions)?;
    let mut snapshots: Vec<SessionSnapshot> =
        sessions.values().map(SessionTimer::snapshot).collect();
    snapshots.sort_by(|a, b| a.activity_id.cmp(&b.activity_id));
    Ok(Json(SessionsResponse {
        sessions: snapshots,
    }))
}

/// POST /api/sessions/:activity_id/start
///
/// Body is optional: `{"expected_minutes": 90}` sets the planned length.
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<String>,
    body: Option<Json<StartSessionRequest>>,
) -> ApiResult<SessionSnapshot> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let key = activity_id.trim().to_string();

    let mut sessions = lock(&state.sessions)?;
    if !sessions.contains_key(&key) {
        let session = SessionTimer::new(state.ctx.clone(), &key, state.observers.clone())?;
        sessions.insert(key.clone(), session);
    }

    let session = sessions
        .get_mut(&key)
        .ok_or_else(|| ApiError::internal("Session vanished"))?;
    if let Some(minutes) = req.expected_minutes {
        session.set_expected_minutes(minutes);
    }
    session.start();
    Ok(Json(session.snapshot()))
}

/// POST /api/sessions/:activity_id/pause
pub async fn pause_session(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let mut sessions = lock(&state.sessions)?;
    let session = sessions
        .get_mut(activity_id.trim())
        .ok_or_else(|| ApiError::not_found(format!("No session for {}", activity_id)))?;
    session.pause();
    Ok(Json(session.snapshot()))
}

//! Activity timer endpoints.

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use super::{lock, ApiResult};
use crate::server::state::AppState;
use crate::timer::{TimerSnapshot, TimerStatus};

#[derive(Debug, Deserialize)]
pub struct StartTimerRequest {
    pub label: String,
}

/// GET /api/timer
pub async fn get_timer(State(state): State<Arc<AppState>>) -> ApiResult<TimerSnapshot> {
    Ok(Json(lock(&state.timer)?.snapshot()))
}

/// POST /api/timer/start - Start tracking `label`. 400 on an empty label.
pub async fn start_timer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartTimerRequest>,
) -> ApiResult<TimerSnapshot> {
    let mut timer = lock(&state.timer)?;
    timer.start(&req.label)?;
    Ok(Json(timer.snapshot()))
}

/// POST /api/timer/pause
pub async fn pause_timer(State(state): State<Arc<AppState>>) -> ApiResult<TimerSnapshot> {
    let mut timer = lock(&state.timer)?;
    timer.pause();
    Ok(Json(timer.snapshot()))
}

/// POST /api/timer/reset - Discard the session without logging it.
pub async fn reset_timer(State(state): State<Arc<AppState>>) -> ApiResult<TimerSnapshot> {
    let mut timer = lock(&state.timer)?;
    timer.reset();
    Ok(Json(timer.snapshot()))
}

/// GET /api/status - Running indicator.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<TimerStatus> {
    Json(state.status.current())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::state::tests::test_state;
    use axum::http::StatusCode;

    fn start_body(label: &str) -> Json<StartTimerRequest> {
        Json(StartTimerRequest {
            label: label.to_string(),
        })
    }

    #[tokio::test]
    async fn test_start_tick_pause_via_api() {
        let (state, _, _) = test_state();

        let Json(snap) = start_timer(State(state.clone()), start_body("Deep Work"))
            .await
            .unwrap();
        assert!(snap.running);
        assert_eq!(snap.activity_id.as_deref(), Some("stopwatch_deep_work"));

        for _ in 0..65 {
            state.tick_all();
        }

        let Json(status) = get_status(State(state.clone())).await;
        assert!(status.running);
        assert_eq!(status.formatted, "00:01:05");

        let Json(snap) = pause_timer(State(state.clone())).await.unwrap();
        assert!(!snap.running);
        assert_eq!(snap.elapsed_secs, 65);

        let durations: Vec<u64> = state
            .ledger
            .records()
            .iter()
            .map(|r| r.duration_seconds)
            .collect();
        assert_eq!(durations, vec![30, 30, 5]);
    }

    #[tokio::test]
    async fn test_empty_label_is_bad_request() {
        let (state, _, _) = test_state();

        let err = start_timer(State(state.clone()), start_body("  "))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Please enter a task name first.");

        let Json(snap) = get_timer(State(state)).await.unwrap();
        assert!(!snap.running);
    }

    #[tokio::test]
    async fn test_reset_discards() {
        let (state, _, _) = test_state();
        start_timer(State(state.clone()), start_body("Reading"))
            .await
            .unwrap();
        for _ in 0..10 {
            state.tick_all();
        }

        let Json(snap) = reset_timer(State(state.clone())).await.unwrap();
        assert_eq!(snap.elapsed_secs, 0);
        assert_eq!(snap.label, "");
        assert!(state.ledger.records().is_empty());
    }
}

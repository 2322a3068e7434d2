//! Configuration endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResult};
use crate::config::{is_valid_setting, Settings};
use crate::database::ConfigEntry;
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    /// Values in effect for this process.
    pub effective: Settings,
    /// Raw rows from the config table. Empty without a database.
    pub settings: Vec<ConfigEntry>,
}

/// GET /api/config - Get all configuration settings
pub async fn get_config(State(state): State<Arc<AppState>>) -> ApiResult<ConfigResponse> {
    let settings = match &state.db {
        Some(db) => db.get_all_config()?,
        None => Vec::new(),
    };

    Ok(Json(ConfigResponse {
        effective: state.settings.clone(),
        settings,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateConfigRequest {
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateConfigResponse {
    pub key: String,
    pub value: String,
    /// Settings are read once at startup.
    pub restart_required: bool,
}

/// PUT /api/config/:key - Store a new value for a known setting.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<UpdateConfigRequest>,
) -> ApiResult<UpdateConfigResponse> {
    let value = req.value.trim().to_string();
    match is_valid_setting(&key, &value) {
        None => return Err(ApiError::not_found(format!("Unknown setting: {}", key))),
        Some(false) => {
            return Err(ApiError::bad_request(format!(
                "Invalid value for {}: {}",
                key, value
            )))
        }
        Some(true) => {}
    }

    let db = state
        .db
        .as_ref()
        .ok_or_else(|| ApiError::internal("Settings cannot be saved without a database"))?;
    db.set_config(&key, &value)?;
    tracing::info!(%key, %value, "Config setting updated");

    Ok(Json(UpdateConfigResponse {
        key,
        value,
        restart_required: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::database::{Database, DEFAULT_CONFIG};
    use axum::http::StatusCode;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_config_with_database() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let settings = Settings::load(&db);
        let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        let state = AppState::build(db.clone(), Some(db), settings, clock);

        let Json(body) = get_config(State(state)).await.unwrap();
        assert_eq!(body.settings.len(), DEFAULT_CONFIG.len());
        assert_eq!(body.effective.chunk_seconds, 30);
    }

    #[tokio::test]
    async fn test_update_config() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        let state = AppState::build(db.clone(), Some(db.clone()), Settings::load(&db), clock);
        let body = |value: &str| {
            Json(UpdateConfigRequest {
                value: value.to_string(),
            })
        };

        let Json(updated) = update_config(
            State(state.clone()),
            Path("chunk_seconds".to_string()),
            body(" 15 "),
        )
        .await
        .unwrap();
        assert_eq!(updated.value, "15");
        assert!(updated.restart_required);
        assert_eq!(Settings::load(&db).chunk_seconds, 15);
        // The running process keeps its settings
        assert_eq!(state.settings.chunk_seconds, 30);

        let err = update_config(
            State(state.clone()),
            Path("chunk_seconds".to_string()),
            body("0"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = update_config(State(state), Path("theme".to_string()), body("dark"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(db.get_config("theme").unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_config_without_database() {
        let (state, _, _) = crate::server::state::tests::test_state();
        let err = update_config(
            State(state),
            Path("server_port".to_string()),
            Json(UpdateConfigRequest {
                value: "9000".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_config_without_database() {
        let (state, _, _) = crate::server::state::tests::test_state();
        let Json(body) = get_config(State(state)).await.unwrap();
        assert!(body.settings.is_empty());
        assert_eq!(body.effective, Settings::default());
    }
}

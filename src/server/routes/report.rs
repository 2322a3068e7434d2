//! Report endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResult};
use crate::server::state::AppState;
use crate::store::{Report, ReportWindow};

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// `week` (default) or `month`.
    pub range: Option<String>,
}

/// GET /api/report?range=week|month
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Report> {
    let window = match query.range.as_deref() {
        None => ReportWindow::default(),
        Some(raw) => raw.parse::<ReportWindow>().map_err(ApiError::bad_request)?,
    };
    Ok(Json(state.aggregator.build_report(window)))
}

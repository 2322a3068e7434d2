//! History ledger endpoints: range query, export and import.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ApiResult;
use crate::clock::Clock;
use crate::server::state::AppState;
use crate::store::HistoryRecord;

/// File name offered for the export download.
pub const EXPORT_FILE_NAME: &str = "essential_data.json";

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// First day included (YYYY-MM-DD), default today.
    pub from: Option<NaiveDate>,
    /// Last day included (YYYY-MM-DD), default today.
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub records: Vec<HistoryRecord>,
    pub total_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

/// GET /api/history?from=&to= - Records in an inclusive date range.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let today = state.ctx.clock.today();
    let from = query.from.unwrap_or(today);
    let to = query.to.unwrap_or(today);

    let range = state.ledger.query_range(from, to);
    Json(HistoryResponse {
        from,
        to,
        records: range.iter().cloned().collect(),
        total_seconds: range.total_seconds(),
    })
}

/// GET /api/history/export - Whole ledger as a JSON download.
pub async fn export_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let disposition = format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME);
    (
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        state.ledger.export_json(),
    )
}

/// POST /api/history/import - Replace the ledger with the posted JSON array.
///
/// All or nothing: one invalid record rejects the import with 400.
pub async fn import_history(
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<ImportResponse> {
    let imported = state.ledger.import_json(&body)?;
    Ok(Json(ImportResponse { imported }))
}

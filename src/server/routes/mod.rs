//! Route handlers module.

pub mod captures;
pub mod config;
pub mod health;
pub mod history;
pub mod report;
pub mod sessions;
pub mod tally;
pub mod timer;

use crate::error::{LedgerError, StoreError, TimerError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

/// Error body returned by every failing handler.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler failure mapped to a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<TimerError> for ApiError {
    fn from(e: TimerError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        if e.is_rejection() {
            Self::bad_request(e.to_string())
        } else {
            tracing::error!(?e, "Ledger operation failed");
            Self::internal(e.to_string())
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!(?e, "Store operation failed");
        Self::internal(e.to_string())
    }
}

/// Locks shared handler state, mapping poisoning to a 500.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, ApiError> {
    mutex.lock().map_err(|_| {
        tracing::error!("Shared state lock poisoned");
        ApiError::internal("State lock poisoned")
    })
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

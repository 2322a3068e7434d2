//! Error types for timer, ledger and store operations.
//!
//! Nothing here is fatal: timers log store failures and keep running,
//! readers fall back to defaults. These types exist so callers (and the
//! HTTP layer) can tell a rejected action from a persistence problem.

/// Failures of the persistent key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejected timer actions. The state machine is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    #[error("Please enter a task name first.")]
    EmptyLabel,

    #[error("Session timer needs an activity id")]
    EmptyActivityId,
}

/// History ledger failures.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Record duration must be greater than zero")]
    ZeroDuration,

    #[error("Record duration of {0} seconds exceeds one day")]
    DurationTooLong(u64),

    #[error("Record activity id must not be empty")]
    EmptyActivityId,

    #[error("Import rejected: {0}")]
    Import(#[source] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// True when the caller supplied bad input, as opposed to a storage failure.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, LedgerError::Store(_))
    }
}

//! Data types for activity history and reporting.
//!
//! Defines the ledger record format (also the export format) and the
//! derived report structures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Prefix for activity ids derived from free-text timer labels.
pub const STOPWATCH_PREFIX: &str = "stopwatch";

/// Category prefixes recognised by the report breakdown, in display order.
pub const CATEGORY_PREFIXES: [&str; 5] = ["learning", "market", "rehab", "timetable", STOPWATCH_PREFIX];

/// A single flushed chunk of tracked time.
///
/// Records are immutable once appended. The serialized form
/// (`{date, activityId, durationSeconds}`) is both the storage format
/// and the export format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Calendar date of the flush (`YYYY-MM-DD`).
    pub date: NaiveDate,

    /// Stable category key, e.g. `market_analysis` or `stopwatch_deep_work`.
    pub activity_id: String,

    /// Length of the chunk in seconds. Always > 0 for a valid record.
    pub duration_seconds: u64,
}

impl HistoryRecord {
    pub fn new(date: NaiveDate, activity_id: impl Into<String>, duration_seconds: u64) -> Self {
        Self {
            date,
            activity_id: activity_id.into(),
            duration_seconds,
        }
    }

    /// Whether this record belongs to the given category prefix.
    pub fn in_category(&self, prefix: &str) -> bool {
        self.activity_id.contains(prefix)
    }
}

/// Derives the activity id for an ad-hoc timer label.
///
/// The label is trimmed, lowercased and each whitespace run collapsed to a
/// single underscore: `"Deep  Work"` becomes `stopwatch_deep_work`.
pub fn derive_activity_id(label: &str) -> String {
    let normalized = label
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    format!("{}_{}", STOPWATCH_PREFIX, normalized)
}

/// Total tracked minutes for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub total_minutes: u64,
}

/// Minutes and share of the window total for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub total_minutes: u64,
    /// Percentage of the window's total minutes, rounded half-up.
    pub share: u64,
}

/// Day/window summary produced by the report aggregator.
///
/// Derived on every read; never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub window_days: u32,

    /// One entry per calendar date, oldest first, ending today.
    pub days: Vec<DayTotal>,

    /// Sum of the per-day minutes.
    pub total_minutes: u64,

    pub average_daily_minutes: u64,

    /// Average daily minutes as a percentage of the reference day.
    pub utilization_rate: u64,

    /// Upper bound for chart scaling: the busiest day, but at least 60.
    pub chart_max_minutes: u64,

    pub categories: Vec<CategoryShare>,
}

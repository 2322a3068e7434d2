//! Append-only history ledger.
//!
//! The ledger is the source of truth for all reporting. It lives under a
//! single store key as a JSON array and is re-read on every operation, so
//! any component holding the same store sees the same sequence.

use super::types::HistoryRecord;
use super::{keys, read_string, KeyValueStore};
use crate::error::LedgerError;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};

/// Longest duration a single record may carry.
pub const MAX_RECORD_SECONDS: u64 = 86_400;

/// Shared, append-only log of `(date, activityId, durationSeconds)` records.
pub struct HistoryLedger {
    store: Arc<dyn KeyValueStore>,

    /// Maximum number of records kept. `None` keeps everything.
    retention: Option<usize>,

    /// Serializes read-modify-write cycles on the ledger key.
    write_lock: Mutex<()>,
}

impl HistoryLedger {
    /// Creates a ledger over the given store with no retention limit.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            retention: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Caps the ledger at `max_records`. Zero means unlimited.
    pub fn with_retention(mut self, max_records: usize) -> Self {
        self.retention = (max_records > 0).then_some(max_records);
        self
    }

    /// Validates and appends a record.
    pub fn append(&self, record: HistoryRecord) -> Result<(), LedgerError> {
        validate(&record)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.load();
        records.push(record);
        self.prune(&mut records);
        self.save(&records)
    }

    /// Returns every record currently in the ledger, oldest first.
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.load()
    }

    /// Records whose date falls within `[start, end]` inclusive.
    ///
    /// The result is a snapshot taken now; iterate it as often as needed.
    pub fn query_range(&self, start: NaiveDate, end: NaiveDate) -> RangeQuery {
        RangeQuery {
            records: self.load(),
            start,
            end,
        }
    }

    /// Sum of `durationSeconds` for records on `date`, 0 if there are none.
    pub fn total_for(&self, date: NaiveDate) -> u64 {
        self.load()
            .iter()
            .filter(|r| r.date == date)
            .fold(0u64, |acc, r| acc.saturating_add(r.duration_seconds))
    }

    /// Serializes the whole ledger in the same format used for storage.
    pub fn export_json(&self) -> String {
        serde_json::to_string(&self.load()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Replaces the ledger with the records in `json`.
    ///
    /// All or nothing: a single invalid record rejects the whole import.
    /// Returns the number of records imported.
    pub fn import_json(&self, json: &str) -> Result<usize, LedgerError> {
        let mut records: Vec<HistoryRecord> =
            serde_json::from_str(json).map_err(LedgerError::Import)?;

        for record in &records {
            validate(record)?;
        }

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut records);
        self.save(&records)?;

        tracing::info!(records = records.len(), "History imported");
        Ok(records.len())
    }

    /// Deletes the whole ledger.
    pub fn clear(&self) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.store.remove(keys::ACTIVITY_HISTORY)?;
        Ok(())
    }

    /// Loads the ledger, skipping malformed entries.
    fn load(&self) -> Vec<HistoryRecord> {
        let Some(raw) = read_string(self.store.as_ref(), keys::ACTIVITY_HISTORY) else {
            return Vec::new();
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(?e, "Corrupt history ledger, treating as empty");
                return Vec::new();
            }
        };

        let total = values.len();
        let records: Vec<HistoryRecord> = values
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .filter(|r| validate(r).is_ok())
            .collect();

        if records.len() != total {
            tracing::warn!(
                skipped = total - records.len(),
                "Skipped malformed history records"
            );
        }

        records
    }

    fn save(&self, records: &[HistoryRecord]) -> Result<(), LedgerError> {
        let json = serde_json::to_string(records).map_err(crate::error::StoreError::from)?;
        self.store.set(keys::ACTIVITY_HISTORY, &json)?;
        Ok(())
    }

    /// Drops the oldest whole records beyond the retention limit.
    fn prune(&self, records: &mut Vec<HistoryRecord>) {
        if let Some(max) = self.retention {
            if records.len() > max {
                let drain_count = records.len() - max;
                records.drain(0..drain_count);
                tracing::debug!(dropped = drain_count, "Pruned oldest history records");
            }
        }
    }
}

fn validate(record: &HistoryRecord) -> Result<(), LedgerError> {
    if record.duration_seconds == 0 {
        return Err(LedgerError::ZeroDuration);
    }
    if record.duration_seconds > MAX_RECORD_SECONDS {
        return Err(LedgerError::DurationTooLong(record.duration_seconds));
    }
    if record.activity_id.trim().is_empty() {
        return Err(LedgerError::EmptyActivityId);
    }
    Ok(())
}

/// Snapshot of ledger records matching an inclusive date range.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    records: Vec<HistoryRecord>,
    start: NaiveDate,
    end: NaiveDate,
}

impl RangeQuery {
    /// Iterates the matching records lazily. Can be called repeatedly.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryRecord> + '_ {
        self.records
            .iter()
            .filter(move |r| r.date >= self.start && r.date <= self.end)
    }

    /// Sum of `durationSeconds` over the matching records.
    pub fn total_seconds(&self) -> u64 {
        self.iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.duration_seconds))
    }
}

//! Quick-capture log.
//!
//! Short free-text notes, newest first, capped so the key stays small.

use super::{keys, read_json, remove_logged, KeyValueStore};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum number of captures kept.
pub const MAX_CAPTURES: usize = 50;

/// One captured note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEntry {
    /// Unix milliseconds at capture time.
    pub id: i64,
    pub text: String,
    pub time: DateTime<Utc>,
}

pub struct CaptureLog {
    store: Arc<dyn KeyValueStore>,
}

impl CaptureLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Prepends a note. Whitespace-only text is ignored and returns `None`.
    pub fn capture(&self, text: &str) -> Result<Option<CaptureEntry>, StoreError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let now = Utc::now();
        let entry = CaptureEntry {
            id: now.timestamp_millis(),
            text: text.to_string(),
            time: now,
        };

        let mut entries = self.entries();
        entries.insert(0, entry.clone());
        entries.truncate(MAX_CAPTURES);

        let json = serde_json::to_string(&entries)?;
        self.store.set(keys::CAPTURE_LOG, &json)?;
        Ok(Some(entry))
    }

    /// All captures, newest first.
    pub fn entries(&self) -> Vec<CaptureEntry> {
        read_json(self.store.as_ref(), keys::CAPTURE_LOG)
    }

    pub fn clear(&self) {
        remove_logged(self.store.as_ref(), keys::CAPTURE_LOG);
    }
}

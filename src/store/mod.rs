//! Persistent storage and aggregation module.
//!
//! Provides the key-value store abstraction every component persists
//! through, the history ledger built on top of it, and the read-side
//! report aggregation.

pub mod aggregator;
pub mod captures;
pub mod ledger;
pub mod tally;
pub mod types;

pub use aggregator::*;
pub use captures::*;
pub use ledger::*;
pub use tally::*;
pub use types::*;

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Mutex;

/// Stable key names shared by every component that touches the store.
pub mod keys {
    /// Activity timer label.
    pub const TIMER_TASK: &str = "ess_sw_task";
    /// Activity timer running flag (`"true"` / `"false"`).
    pub const TIMER_ACTIVE: &str = "ess_sw_active";
    /// Activity timer elapsed seconds.
    pub const TIMER_SECONDS: &str = "ess_sw_seconds";
    /// Elapsed seconds pre-formatted as `HH:MM:SS`.
    pub const TIMER_SECONDS_FORMATTED: &str = "ess_sw_seconds_formatted";
    /// Seconds observed since the last history flush.
    pub const TIMER_PENDING: &str = "ess_sw_pending";
    /// Full history ledger as a JSON array.
    pub const ACTIVITY_HISTORY: &str = "ess_activity_history";
    pub const MARKET_WINS: &str = "ess_m_wins";
    pub const MARKET_LOSSES: &str = "ess_m_losses";
    /// Quick-capture log, newest first.
    pub const CAPTURE_LOG: &str = "ess_logic_ledger";

    /// Every key owned by the activity timer mirror.
    pub const TIMER_MIRROR: [&str; 5] = [
        TIMER_TASK,
        TIMER_ACTIVE,
        TIMER_SECONDS,
        TIMER_SECONDS_FORMATTED,
        TIMER_PENDING,
    ];
}

/// A synchronous, string-keyed, string-valued store.
///
/// Every call is a separate atomic operation on a single key; there are
/// no transactions. Implementations must be shareable across threads.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value under `key`, or `None` if the key is missing.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store backed by a `HashMap`.
///
/// Used by tests and as a fallback when the database cannot be opened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Reads a raw string, treating read failures as a missing key.
pub fn read_string(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(?e, key, "Failed to read key, treating as missing");
            None
        }
    }
}

/// Reads a non-negative integer. Missing or malformed values read as 0.
pub fn read_u64(store: &dyn KeyValueStore, key: &str) -> u64 {
    let Some(raw) = read_string(store, key) else {
        return 0;
    };

    match raw.trim().parse::<u64>() {
        Ok(value) => value,
        Err(_) => {
            if !raw.trim().is_empty() {
                tracing::warn!(key, value = %raw, "Malformed counter, treating as 0");
            }
            0
        }
    }
}

/// Reads a boolean flag. Only the exact text `"true"` is true.
pub fn read_bool(store: &dyn KeyValueStore, key: &str) -> bool {
    read_string(store, key).as_deref() == Some("true")
}

/// Reads a JSON value, falling back to `T::default()` when the key is
/// missing or its content does not parse.
pub fn read_json<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    let Some(raw) = read_string(store, key) else {
        return T::default();
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(?e, key, "Corrupt persisted value, using default");
            T::default()
        }
    }
}

/// Writes a value and logs instead of failing. Returns whether it stuck.
pub fn write_logged(store: &dyn KeyValueStore, key: &str, value: &str) -> bool {
    match store.set(key, value) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(?e, key, "Failed to write key");
            false
        }
    }
}

/// Removes a key and logs instead of failing.
pub fn remove_logged(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        tracing::warn!(?e, key, "Failed to remove key");
    }
}

/// Test store whose writes to one key fail a set number of times.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct FlakyStore {
    pub inner: MemoryStore,
    failing_key: &'static str,
    failures_left: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl FlakyStore {
    pub fn new(failing_key: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_key,
            failures_left: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Makes the next `n` writes to the failing key return an error.
    pub fn fail_next(&self, n: usize) {
        self.failures_left
            .store(n, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        use std::sync::atomic::Ordering;
        if key == self.failing_key {
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(StoreError::Poisoned);
            }
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.remove("a").unwrap();
        assert!(store.get("a").unwrap().is_none());

        // Removing twice is fine
        store.remove("a").unwrap();
    }

    #[test]
    fn test_flaky_store_fails_only_the_chosen_key() {
        let store = FlakyStore::new(keys::ACTIVITY_HISTORY);
        store.fail_next(1);

        assert!(store.set(keys::TIMER_TASK, "x").is_ok());
        assert!(store.set(keys::ACTIVITY_HISTORY, "[]").is_err());
        assert!(store.set(keys::ACTIVITY_HISTORY, "[]").is_ok());
    }

    #[test]
    fn test_read_u64_tolerates_garbage() {
        let store = MemoryStore::new();
        assert_eq!(read_u64(&store, "missing"), 0);

        store.set("n", "42").unwrap();
        assert_eq!(read_u64(&store, "n"), 42);

        store.set("n", "forty-two").unwrap();
        assert_eq!(read_u64(&store, "n"), 0);

        store.set("n", "-5").unwrap();
        assert_eq!(read_u64(&store, "n"), 0);
    }

    #[test]
    fn test_read_bool_is_strict() {
        let store = MemoryStore::new();
        assert!(!read_bool(&store, keys::TIMER_ACTIVE));

        store.set(keys::TIMER_ACTIVE, "true").unwrap();
        assert!(read_bool(&store, keys::TIMER_ACTIVE));

        store.set(keys::TIMER_ACTIVE, "TRUE").unwrap();
        assert!(!read_bool(&store, keys::TIMER_ACTIVE));
    }

    #[test]
    fn test_read_json_falls_back_on_corruption() {
        let store = MemoryStore::new();
        store.set("list", "[1, 2,").unwrap();

        let value: Vec<u32> = read_json(&store, "list");
        assert!(value.is_empty());

        store.set("list", "[1, 2]").unwrap();
        let value: Vec<u32> = read_json(&store, "list");
        assert_eq!(value, vec![1, 2]);
    }
}

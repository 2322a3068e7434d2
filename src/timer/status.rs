//! Read-only view of the activity timer for other components.
//!
//! [`LiveStatus`] follows timer events as they happen. [`StorePoller`]
//! reads the persisted mirror instead, for consumers that only share the
//! store with the timer.

use super::{format_hms, TimerEvent, TimerObserver, ACTIVITY_SOURCE};
use crate::store::{keys, read_bool, read_string, read_u64, KeyValueStore};
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// What is currently being timed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimerStatus {
    pub running: bool,
    pub task: String,
    pub elapsed_secs: u64,
    pub formatted: String,
}

impl TimerStatus {
    fn idle() -> Self {
        Self {
            formatted: format_hms(0),
            ..Default::default()
        }
    }
}

/// Anything that can report the activity timer status.
pub trait StatusFeed: Send + Sync {
    fn current(&self) -> TimerStatus;
}

/// Status kept up to date from activity timer events.
pub struct LiveStatus {
    status: Mutex<TimerStatus>,
}

impl Default for LiveStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveStatus {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(TimerStatus::idle()),
        }
    }

    /// Seeds the cache, e.g. from a restored timer.
    pub fn seed(&self, status: TimerStatus) {
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        }
    }
}

impl TimerObserver for LiveStatus {
    fn on_event(&self, event: &TimerEvent) {
        if event.source() != ACTIVITY_SOURCE {
            return;
        }

        let Ok(mut status) = self.status.lock() else {
            tracing::warn!("Status cache lock poisoned");
            return;
        };

        match event {
            TimerEvent::Started {
                label, elapsed_secs, ..
            }
            | TimerEvent::Resumed {
                label, elapsed_secs, ..
            } => {
                status.running = true;
                status.task = label.clone();
                status.elapsed_secs = *elapsed_secs;
            }
            TimerEvent::Tick { elapsed_secs, .. } => {
                status.elapsed_secs = *elapsed_secs;
            }
            TimerEvent::Paused { elapsed_secs, .. } => {
                status.running = false;
                status.elapsed_secs = *elapsed_secs;
            }
            TimerEvent::Reset { .. } => {
                *status = TimerStatus::idle();
            }
            TimerEvent::ChunkFlushed { .. } => {}
        }
        status.formatted = format_hms(status.elapsed_secs);
    }
}

impl StatusFeed for LiveStatus {
    fn current(&self) -> TimerStatus {
        self.status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|_| TimerStatus::idle())
    }
}

/// Status read from the timer mirror keys on every call.
pub struct StorePoller {
    store: Arc<dyn KeyValueStore>,
}

impl StorePoller {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl StatusFeed for StorePoller {
    fn current(&self) -> TimerStatus {
        let store = self.store.as_ref();
        let elapsed_secs = read_u64(store, keys::TIMER_SECONDS);
        TimerStatus {
            running: read_bool(store, keys::TIMER_ACTIVE),
            task: read_string(store, keys::TIMER_TASK).unwrap_or_default(),
            elapsed_secs,
            formatted: read_string(store, keys::TIMER_SECONDS_FORMATTED)
                .unwrap_or_else(|| format_hms(elapsed_secs)),
        }
    }
}

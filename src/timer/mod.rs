//! Timer state machines.
//!
//! This module contains the activity timer (free-text task, mirrored into
//! the store, resumable after restart), the session timer (fixed activity,
//! memory only), the ticker thread that drives both, and the event channel
//! other components use to follow them without polling.

pub mod activity;
pub mod session;
pub mod status;
pub mod ticker;

pub use activity::*;
pub use session::*;
pub use status::*;
pub use ticker::*;

use crate::clock::Clock;
use crate::store::{HistoryLedger, HistoryRecord};
use serde::Serialize;
use std::sync::Arc;

/// Seconds per flushed history chunk.
pub const DEFAULT_CHUNK_SECONDS: u64 = 30;

/// Event source name used by the activity timer.
pub const ACTIVITY_SOURCE: &str = "stopwatch";

/// Prefix of session timer event sources, followed by the activity id.
pub const SESSION_SOURCE_PREFIX: &str = "session:";

/// Collaborators every timer needs to flush history.
#[derive(Clone)]
pub struct TimerContext {
    pub ledger: Arc<HistoryLedger>,
    pub clock: Arc<dyn Clock>,
    pub chunk_secs: u64,
}

impl TimerContext {
    pub fn new(ledger: Arc<HistoryLedger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            clock,
            chunk_secs: DEFAULT_CHUNK_SECONDS,
        }
    }

    /// Overrides the chunk size. Zero is ignored.
    pub fn with_chunk_secs(mut self, chunk_secs: u64) -> Self {
        if chunk_secs > 0 {
            self.chunk_secs = chunk_secs;
        }
        self
    }

    /// Appends a chunk for `activity_id` dated today. Returns the record on success.
    fn flush(&self, activity_id: &str, secs: u64) -> Option<HistoryRecord> {
        let record = HistoryRecord::new(self.clock.today(), activity_id, secs);
        match self.ledger.append(record.clone()) {
            Ok(()) => {
                tracing::debug!(
                    activity = %activity_id,
                    duration_secs = secs,
                    "Flushed history chunk"
                );
                Some(record)
            }
            Err(e) => {
                tracing::warn!(?e, activity = %activity_id, "Failed to flush history chunk");
                None
            }
        }
    }
}

/// Something that happened to a timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    /// Explicit start (not a restore).
    Started {
        source: String,
        label: String,
        elapsed_secs: u64,
    },
    /// Timer picked up a running session persisted before restart.
    Resumed {
        source: String,
        label: String,
        elapsed_secs: u64,
    },
    Tick {
        source: String,
        elapsed_secs: u64,
    },
    ChunkFlushed {
        source: String,
        record: HistoryRecord,
    },
    Paused {
        source: String,
        elapsed_secs: u64,
    },
    Reset {
        source: String,
    },
}

impl TimerEvent {
    /// Name of the timer that produced the event.
    pub fn source(&self) -> &str {
        match self {
            TimerEvent::Started { source, .. }
            | TimerEvent::Resumed { source, .. }
            | TimerEvent::Tick { source, .. }
            | TimerEvent::ChunkFlushed { source, .. }
            | TimerEvent::Paused { source, .. }
            | TimerEvent::Reset { source } => source,
        }
    }
}

/// Receives timer events. Called synchronously on the timer's thread.
pub trait TimerObserver: Send + Sync {
    fn on_event(&self, event: &TimerEvent);
}

/// Fan-out list of observers.
#[derive(Clone, Default)]
pub struct Observers {
    observers: Vec<Arc<dyn TimerObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Arc<dyn TimerObserver>) {
        self.observers.push(observer);
    }

    pub fn with(mut self, observer: Arc<dyn TimerObserver>) -> Self {
        self.subscribe(observer);
        self
    }

    pub fn publish(&self, event: &TimerEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

/// Elapsed/pending bookkeeping shared by both timer kinds.
///
/// `pending` counts seconds observed since the last successful flush, so
/// the sum of flushed chunks always equals the seconds observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChunkCounter {
    elapsed: u64,
    pending: u64,
    chunk: u64,
}

impl ChunkCounter {
    fn new(chunk: u64) -> Self {
        Self {
            elapsed: 0,
            pending: 0,
            chunk: chunk.max(1),
        }
    }

    /// Advances one second. Returns the seconds to flush if a chunk boundary was hit.
    fn advance(&mut self) -> Option<u64> {
        self.elapsed += 1;
        self.pending += 1;
        (self.elapsed % self.chunk == 0).then_some(self.pending)
    }

    /// Seconds left over since the last flush, if any.
    fn remainder(&self) -> Option<u64> {
        (self.pending > 0).then_some(self.pending)
    }

    fn mark_flushed(&mut self) {
        self.pending = 0;
    }

    fn clear(&mut self) {
        self.elapsed = 0;
        self.pending = 0;
    }
}

/// Formats seconds as `HH:MM:SS`. Hours are not wrapped.
pub fn format_hms(total_secs: u64) -> String {
    let hrs = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hrs, mins, secs)
}

/// Test observer that records every event it sees.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub events: std::sync::Mutex<Vec<TimerEvent>>,
}

#[cfg(test)]
impl TimerObserver for RecordingObserver {
    fn on_event(&self, event: &TimerEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(65), "00:01:05");
        assert_eq!(format_hms(3600 + 61), "01:01:01");
        assert_eq!(format_hms(100 * 3600), "100:00:00");
    }

    #[test]
    fn test_chunk_counter_boundaries() {
        let mut counter = ChunkCounter::new(30);
        for _ in 0..29 {
            assert_eq!(counter.advance(), None);
        }
        assert_eq!(counter.advance(), Some(30));
        counter.mark_flushed();
        assert_eq!(counter.remainder(), None);

        counter.advance();
        assert_eq!(counter.remainder(), Some(1));
    }

    #[test]
    fn test_chunk_counter_after_partial_flush() {
        let mut counter = ChunkCounter::new(30);
        for _ in 0..29 {
            counter.advance();
        }
        // Pause flushes the 29 seconds
        assert_eq!(counter.remainder(), Some(29));
        counter.mark_flushed();

        // One more second reaches the boundary but only that second is new
        assert_eq!(counter.advance(), Some(1));
    }

    #[test]
    fn test_event_serialization() {
        let event = TimerEvent::Paused {
            source: ACTIVITY_SOURCE.to_string(),
            elapsed_secs: 65,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "paused");
        assert_eq!(json["elapsed_secs"], 65);
        assert_eq!(event.source(), "stopwatch");
    }

    #[test]
    fn test_observers_fan_out() {
        let a = Arc::new(RecordingObserver::default());
        let b = Arc::new(RecordingObserver::default());
        let observers = Observers::new().with(a.clone()).with(b.clone());
        assert_eq!(observers.len(), 2);

        observers.publish(&TimerEvent::Reset {
            source: "x".to_string(),
        });

        assert_eq!(a.events.lock().unwrap().len(), 1);
        assert_eq!(b.events.lock().unwrap().len(), 1);
    }
}

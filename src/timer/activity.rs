//! Activity timer for ad-hoc, free-text tasks.
//!
//! The timer owns its state and mirrors it into the store on start, on
//! every tick and on pause, so a restarted process can pick up a running
//! session and other components can show what is running. The mirror is
//! only read back at construction.

use super::{format_hms, ChunkCounter, Observers, TimerContext, TimerEvent, ACTIVITY_SOURCE};
use crate::error::TimerError;
use crate::store::{
    derive_activity_id, keys, read_bool, read_string, read_u64, remove_logged, write_logged,
    KeyValueStore,
};
use serde::Serialize;
use std::sync::Arc;

/// Point-in-time view of the activity timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub label: String,
    pub activity_id: Option<String>,
    pub elapsed_secs: u64,
    pub formatted: String,
    pub running: bool,
}

/// Start/pause/resume/reset timer for a named task.
///
/// At most one instance should be live per process; two instances would
/// race to append chunks for overlapping periods.
pub struct ActivityTimer {
    label: String,
    counter: ChunkCounter,
    running: bool,
    ctx: TimerContext,
    store: Arc<dyn KeyValueStore>,
    observers: Observers,
}

impl ActivityTimer {
    /// Builds the timer from the persisted mirror.
    ///
    /// A mirror that says `running` resumes ticking from the stored
    /// elapsed seconds. Nothing is written to history for the time the
    /// process was not running.
    pub fn restore(ctx: TimerContext, store: Arc<dyn KeyValueStore>, observers: Observers) -> Self {
        let label = read_string(store.as_ref(), keys::TIMER_TASK)
            .unwrap_or_default()
            .trim()
            .to_string();
        let mut running = read_bool(store.as_ref(), keys::TIMER_ACTIVE);
        let elapsed = read_u64(store.as_ref(), keys::TIMER_SECONDS);

        if running && label.is_empty() {
            tracing::warn!("Persisted timer was running without a task name, not resuming");
            running = false;
        }

        let mut counter = ChunkCounter::new(ctx.chunk_secs);
        counter.elapsed = elapsed;
        counter.pending = match read_string(store.as_ref(), keys::TIMER_PENDING) {
            Some(_) => read_u64(store.as_ref(), keys::TIMER_PENDING).min(elapsed),
            None if running => elapsed % counter.chunk,
            None => 0,
        };

        let timer = Self {
            label,
            counter,
            running,
            ctx,
            store,
            observers,
        };

        if timer.running {
            tracing::info!(
                label = %timer.label,
                elapsed_secs = elapsed,
                "Resuming activity timer from persisted state"
            );
            timer.observers.publish(&TimerEvent::Resumed {
                source: ACTIVITY_SOURCE.to_string(),
                label: timer.label.clone(),
                elapsed_secs: elapsed,
            });
        }

        timer
    }

    /// Starts (or continues) tracking `label`.
    ///
    /// Rejects an empty label without touching any state. Starting an
    /// already running timer is a no-op.
    pub fn start(&mut self, label: &str) -> Result<(), TimerError> {
        if self.running {
            tracing::debug!(label = %self.label, "Timer already running");
            return Ok(());
        }

        let label = label.trim();
        if label.is_empty() {
            tracing::warn!("Rejected timer start without a task name");
            return Err(TimerError::EmptyLabel);
        }

        self.label = label.to_string();
        self.running = true;
        self.mirror();

        tracing::info!(
            label = %self.label,
            elapsed_secs = self.counter.elapsed,
            "Activity timer started"
        );
        self.observers.publish(&TimerEvent::Started {
            source: ACTIVITY_SOURCE.to_string(),
            label: self.label.clone(),
            elapsed_secs: self.counter.elapsed,
        });
        Ok(())
    }

    /// Advances one second. Does nothing unless running.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if let Some(secs) = self.counter.advance() {
            self.flush(secs);
        }
        self.mirror();

        tracing::trace!(elapsed_secs = self.counter.elapsed, "Activity timer tick");
        self.observers.publish(&TimerEvent::Tick {
            source: ACTIVITY_SOURCE.to_string(),
            elapsed_secs: self.counter.elapsed,
        });
    }

    /// Stops ticking and flushes the seconds since the last chunk.
    ///
    /// Pausing a paused timer is a no-op.
    pub fn pause(&mut self) {
        if !self.running {
            tracing::debug!("Timer already paused");
            return;
        }

        self.running = false;
        if let Some(secs) = self.counter.remainder() {
            self.flush(secs);
        }
        self.mirror();

        tracing::info!(
            label = %self.label,
            elapsed_secs = self.counter.elapsed,
            "Activity timer paused"
        );
        self.observers.publish(&TimerEvent::Paused {
            source: ACTIVITY_SOURCE.to_string(),
            elapsed_secs: self.counter.elapsed,
        });
    }

    /// Stops the timer and discards the session.
    ///
    /// Unlike [`pause`](Self::pause), the unflushed remainder is dropped,
    /// never written to history. The mirror keys are deleted.
    pub fn reset(&mut self) {
        let discarded = self.counter.pending;
        self.running = false;
        self.counter.clear();
        self.label.clear();

        for key in keys::TIMER_MIRROR {
            remove_logged(self.store.as_ref(), key);
        }

        tracing::info!(discarded_secs = discarded, "Activity timer reset");
        self.observers.publish(&TimerEvent::Reset {
            source: ACTIVITY_SOURCE.to_string(),
        });
    }

    pub fn subscribe(&mut self, observer: Arc<dyn super::TimerObserver>) {
        self.observers.subscribe(observer);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.counter.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// History key for the current label, `None` while unlabelled.
    pub fn activity_id(&self) -> Option<String> {
        (!self.label.is_empty()).then(|| derive_activity_id(&self.label))
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            label: self.label.clone(),
            activity_id: self.activity_id(),
            elapsed_secs: self.counter.elapsed,
            formatted: format_hms(self.counter.elapsed),
            running: self.running,
        }
    }

    fn flush(&mut self, secs: u64) {
        let Some(activity_id) = self.activity_id() else {
            return;
        };

        // On failure pending is kept and carried into the next flush
        if let Some(record) = self.ctx.flush(&activity_id, secs) {
            self.counter.mark_flushed();
            self.observers.publish(&TimerEvent::ChunkFlushed {
                source: ACTIVITY_SOURCE.to_string(),
                record,
            });
        }
    }

    fn mirror(&self) {
        let store = self.store.as_ref();
        write_logged(store, keys::TIMER_TASK, &self.label);
        write_logged(store, keys::TIMER_ACTIVE, if self.running { "true" } else { "false" });
        write_logged(store, keys::TIMER_SECONDS, &self.counter.elapsed.to_string());
        write_logged(
            store,
            keys::TIMER_SECONDS_FORMATTED,
            &format_hms(self.counter.elapsed),
        );
        write_logged(store, keys::TIMER_PENDING, &self.counter.pending.to_string());
    }
}

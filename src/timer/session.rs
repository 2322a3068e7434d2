//! Session timer bound to a fixed activity id.
//!
//! Used by the learning, market and rehab screens. Same chunk mechanics as
//! the activity timer, but nothing is mirrored: the session lives and dies
//! with the process.

use super::{
    format_hms, ChunkCounter, Observers, TimerContext, TimerEvent, SESSION_SOURCE_PREFIX,
};
use crate::error::TimerError;
use crate::store::aggregator::round_ratio;
use serde::Serialize;

/// Point-in-time view of a session timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub activity_id: String,
    pub elapsed_secs: u64,
    pub formatted: String,
    pub running: bool,
    pub expected_minutes: Option<u64>,
    pub progress_percent: u64,
}

pub struct SessionTimer {
    activity_id: String,
    /// Event source, `session:<activity_id>`.
    source: String,
    counter: ChunkCounter,
    running: bool,
    expected_minutes: Option<u64>,
    ctx: TimerContext,
    observers: Observers,
}

impl SessionTimer {
    pub fn new(
        ctx: TimerContext,
        activity_id: &str,
        observers: Observers,
    ) -> Result<Self, TimerError> {
        let activity_id = activity_id.trim();
        if activity_id.is_empty() {
            return Err(TimerError::EmptyActivityId);
        }

        Ok(Self {
            activity_id: activity_id.to_string(),
            source: format!("{}{}", SESSION_SOURCE_PREFIX, activity_id),
            counter: ChunkCounter::new(ctx.chunk_secs),
            running: false,
            expected_minutes: None,
            ctx,
            observers,
        })
    }

    /// Planned length of the session, used for progress. Zero clears it.
    pub fn with_expected_minutes(mut self, minutes: u64) -> Self {
        self.set_expected_minutes(minutes);
        self
    }

    pub fn set_expected_minutes(&mut self, minutes: u64) {
        self.expected_minutes = (minutes > 0).then_some(minutes);
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;

        tracing::info!(activity = %self.activity_id, "Session started");
        self.observers.publish(&TimerEvent::Started {
            source: self.source.clone(),
            label: self.activity_id.clone(),
            elapsed_secs: self.counter.elapsed,
        });
    }

    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if let Some(secs) = self.counter.advance() {
            self.flush(secs);
        }
        self.observers.publish(&TimerEvent::Tick {
            source: self.source.clone(),
            elapsed_secs: self.counter.elapsed,
        });
    }

    /// Stops ticking and flushes the partial chunk.
    pub fn pause(&mut self) {
        if !self.running {
            return;
        }

        self.running = false;
        if let Some(secs) = self.counter.remainder() {
            self.flush(secs);
        }

        tracing::info!(
            activity = %self.activity_id,
            elapsed_secs = self.counter.elapsed,
            "Session paused"
        );
        self.observers.publish(&TimerEvent::Paused {
            source: self.source.clone(),
            elapsed_secs: self.counter.elapsed,
        });
    }

    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.counter.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn expected_minutes(&self) -> Option<u64> {
        self.expected_minutes
    }

    /// Elapsed share of the expected length, capped at 100. 0 without an expectation.
    pub fn progress_percent(&self) -> u64 {
        self.expected_minutes
            .map(|minutes| {
                round_ratio(
                    self.counter.elapsed.saturating_mul(100),
                    minutes.saturating_mul(60),
                )
                .min(100)
            })
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            activity_id: self.activity_id.clone(),
            elapsed_secs: self.counter.elapsed,
            formatted: format_hms(self.counter.elapsed),
            running: self.running,
            expected_minutes: self.expected_minutes,
            progress_percent: self.progress_percent(),
        }
    }

    fn flush(&mut self, secs: u64) {
        if let Some(record) = self.ctx.flush(&self.activity_id, secs) {
            self.counter.mark_flushed();
            self.observers.publish(&TimerEvent::ChunkFlushed {
                source: self.source.clone(),
                record,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::{HistoryLedger, MemoryStore};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn setup() -> (Arc<HistoryLedger>, TimerContext) {
        let ledger = Arc::new(HistoryLedger::new(Arc::new(MemoryStore::new())));
        let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        let ctx = TimerContext::new(ledger.clone(), clock);
        (ledger, ctx)
    }

    #[test]
    fn test_empty_activity_id_rejected() {
        let (_, ctx) = setup();
        assert!(matches!(
            SessionTimer::new(ctx, "  ", Observers::new()),
            Err(TimerError::EmptyActivityId)
        ));
    }

    #[test]
    fn test_session_flushes_chunks_under_activity_id() {
        let (ledger, ctx) = setup();
        let mut session = SessionTimer::new(ctx, "learning_frm_p1", Observers::new()).unwrap();
        session.start();
        for _ in 0..75 {
            session.tick();
        }
        session.pause();

        let records = ledger.records();
        let durations: Vec<u64> = records.iter().map(|r| r.duration_seconds).collect();
        assert_eq!(durations, vec![30, 30, 15]);
        assert!(records.iter().all(|r| r.activity_id == "learning_frm_p1"));
    }

    #[test]
    fn test_session_not_ticking_until_started() {
        let (ledger, ctx) = setup();
        let mut session = SessionTimer::new(ctx, "rehab_phase_1", Observers::new()).unwrap();
        for _ in 0..40 {
            session.tick();
        }
        session.pause();

        assert_eq!(session.elapsed_secs(), 0);
        assert!(ledger.records().is_empty());
    }

    #[test]
    fn test_progress_percent_capped() {
        let (_, ctx) = setup();
        let mut session = SessionTimer::new(ctx, "market_analysis", Observers::new())
            .unwrap()
            .with_expected_minutes(1);
        assert_eq!(session.progress_percent(), 0);

        session.start();
        for _ in 0..30 {
            session.tick();
        }
        assert_eq!(session.progress_percent(), 50);

        for _ in 0..60 {
            session.tick();
        }
        assert_eq!(session.progress_percent(), 100);

        session.set_expected_minutes(0);
        assert_eq!(session.expected_minutes(), None);
        assert_eq!(session.progress_percent(), 0);
    }

    #[test]
    fn test_events_use_session_source() {
        let (_, ctx) = setup();
        let recorder = Arc::new(crate::timer::RecordingObserver::default());
        let mut session =
            SessionTimer::new(ctx, "stopwatch", Observers::new().with(recorder.clone())).unwrap();
        session.start();
        session.tick();
        session.pause();

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.source() == "session:stopwatch"));
    }

    #[test]
    fn test_custom_chunk_size() {
        let (ledger, ctx) = setup();
        let mut session =
            SessionTimer::new(ctx.with_chunk_secs(10), "learning_ds", Observers::new()).unwrap();
        session.start();
        for _ in 0..25 {
            session.tick();
        }
        session.pause();

        let durations: Vec<u64> = ledger.records().iter().map(|r| r.duration_seconds).collect();
        assert_eq!(durations, vec![10, 10, 5]);
    }
}

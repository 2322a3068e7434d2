//! Shared application state for the HTTP server.

use crate::clock::Clock;
use crate::config::Settings;
use crate::database::Database;
use crate::store::{CaptureLog, HistoryLedger, KeyValueStore, ReportAggregator, Tally};
use crate::timer::{
    ActivityTimer, LiveStatus, Observers, SessionTimer, StatusFeed, TimerContext, TimerEvent,
    TimerObserver, TimerStatus,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Application state shared across all handlers and the ticker.
#[derive(Clone)]
pub struct AppState {
    pub timer: Arc<Mutex<ActivityTimer>>,
    /// Session timers keyed by activity id, created on first start.
    pub sessions: Arc<Mutex<HashMap<String, SessionTimer>>>,
    pub ledger: Arc<HistoryLedger>,
    pub aggregator: Arc<ReportAggregator>,
    pub tally: Arc<Tally>,
    pub captures: Arc<CaptureLog>,
    pub status: Arc<dyn StatusFeed>,
    pub settings: Settings,
    /// Present when a database backs the store.
    pub db: Option<Arc<Database>>,
    /// Used to build session timers on demand.
    pub ctx: TimerContext,
    pub observers: Observers,
    /// Broadcast channel for WebSocket updates.
    pub broadcast_tx: broadcast::Sender<String>,
}

impl AppState {
    /// Wires the ledger, timers and read models over `store`.
    ///
    /// The activity timer is restored from its mirror here, so a session
    /// that was running before restart is running again once this returns.
    pub fn build(
        store: Arc<dyn KeyValueStore>,
        db: Option<Arc<Database>>,
        settings: Settings,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let (broadcast_tx, _) = broadcast::channel::<String>(100);

        let ledger =
            Arc::new(HistoryLedger::new(store.clone()).with_retention(settings.history_retention));
        let ctx = TimerContext::new(ledger.clone(), clock.clone())
            .with_chunk_secs(settings.chunk_seconds);

        let live = Arc::new(LiveStatus::new());
        let observers = Observers::new()
            .with(live.clone())
            .with(Arc::new(BroadcastObserver::new(broadcast_tx.clone())));

        let timer = ActivityTimer::restore(ctx.clone(), store.clone(), observers.clone());
        let snapshot = timer.snapshot();
        live.seed(TimerStatus {
            running: snapshot.running,
            task: snapshot.label,
            elapsed_secs: snapshot.elapsed_secs,
            formatted: snapshot.formatted,
        });

        let aggregator = ReportAggregator::new(ledger.clone(), clock)
            .with_reference_minutes(settings.reference_minutes_per_day);

        Arc::new(Self {
            timer: Arc::new(Mutex::new(timer)),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ledger,
            aggregator: Arc::new(aggregator),
            tally: Arc::new(Tally::new(store.clone())),
            captures: Arc::new(CaptureLog::new(store)),
            status: live,
            settings,
            db,
            ctx,
            observers,
            broadcast_tx,
        })
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.broadcast_tx.subscribe()
    }

    /// Ticks the activity timer and every session timer once.
    pub fn tick_all(&self) {
        match self.timer.lock() {
            Ok(mut timer) => timer.tick(),
            Err(_) => tracing::warn!("Activity timer lock poisoned, tick skipped"),
        }

        match self.sessions.lock() {
            Ok(mut sessions) => sessions.values_mut().for_each(SessionTimer::tick),
            Err(_) => tracing::warn!("Session timers lock poisoned, tick skipped"),
        }
    }
}

/// Builds the JSON envelope pushed to WebSocket clients.
pub fn envelope(update_type: &str, data: &impl serde::Serialize) -> Option<String> {
    let message = serde_json::json!({
        "type": update_type,
        "data": data,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    serde_json::to_string(&message).ok()
}

/// Forwards timer events to WebSocket clients.
pub struct BroadcastObserver {
    tx: broadcast::Sender<String>,
}

impl BroadcastObserver {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl TimerObserver for BroadcastObserver {
    fn on_event(&self, event: &TimerEvent) {
        if let Some(json) = envelope("timer_event", event) {
            // No receivers is fine
            let _ = self.tx.send(json);
        }
    }
}

//! One-second tick driver.
//!
//! Timers never look at the wall clock; they count the ticks delivered
//! here. Time during which no ticker runs is simply not counted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Configuration for the ticker thread.
#[derive(Debug, Clone)]
pub struct TickerConfig {
    /// Delay between ticks (default: 1000ms).
    pub interval: Duration,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
        }
    }
}

/// Spawns the ticker thread.
///
/// `on_tick` runs once per interval until `shutdown` is set. Deadlines are
/// scheduled from the previous deadline, so slow callbacks do not make the
/// ticker drift. If a callback overruns a whole interval the missed ticks
/// are dropped rather than delivered in a burst.
///
/// # Example
/// ```ignore
/// let shutdown = Arc::new(AtomicBool::new(false));
/// let handle = spawn_ticker_thread(Arc::clone(&shutdown), TickerConfig::default(), move || {
///     timer.lock().unwrap().tick();
/// });
///
/// shutdown.store(true, Ordering::SeqCst);
/// handle.join().unwrap();
/// ```
pub fn spawn_ticker_thread<F>(
    shutdown: Arc<AtomicBool>,
    config: TickerConfig,
    mut on_tick: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    thread::spawn(move || {
        tracing::info!(
            interval_ms = config.interval.as_millis(),
            "Ticker thread started"
        );

        let mut deadline = Instant::now() + config.interval;

        loop {
            // Sleep in short slices so shutdown is noticed promptly
            while !shutdown.load(Ordering::SeqCst) {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                thread::sleep((deadline - now).min(Duration::from_millis(100)));
            }

            if shutdown.load(Ordering::SeqCst) {
                break;
            }

            on_tick();

            deadline += config.interval;
            let now = Instant::now();
            if deadline <= now {
                tracing::trace!("Ticker overran its interval, skipping missed ticks");
                deadline = now + config.interval;
            }
        }

        tracing::info!("Ticker thread shutting down");
    })
}

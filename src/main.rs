//! Essential - local activity timer service.
//!
//! Restores the activity timer, serves the HTTP API and drives every timer
//! from a one-second ticker until Ctrl+C.

use essential::clock::SystemClock;
use essential::config::Settings;
use essential::database::Database;
use essential::server::{start_server, state::AppState};
use essential::store::{KeyValueStore, MemoryStore};
use essential::timer::{spawn_ticker_thread, TickerConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("essential=info")),
        )
        .init();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              Essential - Activity Timer                    ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    println!("🔧 Initializing database...");
    let (store, db, settings): (Arc<dyn KeyValueStore>, Option<Arc<Database>>, Settings) =
        match Database::open() {
            Ok(db) => {
                let db = Arc::new(db);
                let settings = Settings::load(&db);
                println!("   ✓ Database ready");
                let store: Arc<dyn KeyValueStore> = db.clone();
                (store, Some(db), settings)
            }
            Err(e) => {
                tracing::error!(?e, "Failed to open database, history will not persist");
                println!("   ⚠ Database unavailable, running in memory");
                let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
                (store, None, Settings::default())
            }
        };
    tracing::debug!(?settings, "Loaded settings");

    let clock = Arc::new(SystemClock::new(settings.day_boundary));
    let state = AppState::build(store, db, settings.clone(), clock);

    if let Ok(timer) = state.timer.lock() {
        if timer.is_running() {
            println!(
                "   ↻ Resumed \"{}\" at {}",
                timer.label(),
                timer.snapshot().formatted
            );
        }
    }

    println!("🔧 Starting HTTP server...");
    let _server = match start_server(Arc::clone(&state), settings.server_port) {
        Ok(handle) => {
            println!(
                "   ✓ HTTP server listening on http://127.0.0.1:{}",
                settings.server_port
            );
            handle
        }
        Err(e) => {
            tracing::error!(?e, port = settings.server_port, "HTTP server failed to start");
            println!("   ✗ Could not listen on port {}", settings.server_port);
            return Err(e.into());
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));

    let (quit_tx, quit_rx) = mpsc::channel::<()>();
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        println!("\n🛑 Shutdown signal received...");
        shutdown_ctrlc.store(true, Ordering::SeqCst);
        let _ = quit_tx.send(());
    })?;

    println!("🔧 Starting ticker...");
    let tick_state = Arc::clone(&state);
    let ticker_handle = spawn_ticker_thread(
        Arc::clone(&shutdown),
        TickerConfig {
            interval: settings.tick_interval(),
        },
        move || tick_state.tick_all(),
    );
    println!("   ✓ Ticker started");

    println!();
    println!("🌐 API available at http://127.0.0.1:{}", settings.server_port);
    println!("   • GET  /api/timer   - Activity timer");
    println!("   • GET  /api/report  - Weekly / monthly report");
    println!("   • WS   /ws          - Real-time timer events");
    println!("   Press Ctrl+C to quit");
    println!();

    // Block until Ctrl+C
    let _ = quit_rx.recv();

    println!("\n⏳ Shutting down...");
    shutdown.store(true, Ordering::SeqCst);
    if ticker_handle.join().is_err() {
        tracing::error!("Ticker thread panicked");
    }

    // The activity timer is left running in its mirror so the next start
    // resumes it. Unflushed session seconds are dropped.
    if let Ok(timer) = state.timer.lock() {
        let snapshot = timer.snapshot();
        tracing::info!(
            running = snapshot.running,
            elapsed_secs = snapshot.elapsed_secs,
            "Activity timer state kept for next start"
        );
    }

    println!("👋 Essential has exited. Goodbye!");
    Ok(())
}

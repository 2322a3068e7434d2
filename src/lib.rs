//! Essential - activity timer and history aggregation.
//!
//! Timers count one-second ticks and append fixed-size chunks of tracked
//! time to a shared history ledger. Reports are recomputed from that
//! ledger on every read.

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod server;
pub mod store;
pub mod timer;

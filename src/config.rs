//! Typed runtime settings read from the `config` table.

use crate::clock::DayBoundary;
use crate::database::Database;
use crate::store::{DEFAULT_REFERENCE_MINUTES_PER_DAY, MAX_RECORD_SECONDS};
use crate::timer::DEFAULT_CHUNK_SECONDS;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_SERVER_PORT: u16 = 13235;

/// Settings used to wire up the timers, ledger and server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub chunk_seconds: u64,
    pub reference_minutes_per_day: u64,
    pub tick_interval_ms: u64,
    /// Maximum ledger records, 0 for unlimited.
    pub history_retention: usize,
    pub day_boundary: DayBoundary,
    pub server_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_seconds: DEFAULT_CHUNK_SECONDS,
            reference_minutes_per_day: DEFAULT_REFERENCE_MINUTES_PER_DAY,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            history_retention: 0,
            day_boundary: DayBoundary::default(),
            server_port: DEFAULT_SERVER_PORT,
        }
    }
}

impl Settings {
    /// Loads every setting, falling back to the default for anything
    /// missing, unparsable or out of range.
    pub fn load(db: &Database) -> Self {
        let defaults = Self::default();

        let chunk_seconds =
            read_setting(db, "chunk_seconds", defaults.chunk_seconds, valid_chunk);
        let reference_minutes_per_day = read_setting(
            db,
            "reference_minutes_per_day",
            defaults.reference_minutes_per_day,
            positive,
        );
        let tick_interval_ms =
            read_setting(db, "tick_interval_ms", defaults.tick_interval_ms, positive);
        let history_retention =
            read_setting(db, "history_retention", defaults.history_retention, any);
        let day_boundary = read_setting(db, "day_boundary", defaults.day_boundary, any);
        let server_port = read_setting(db, "server_port", defaults.server_port, |v| *v > 0);

        Self {
            chunk_seconds,
            reference_minutes_per_day,
            tick_interval_ms,
            history_retention,
            day_boundary,
            server_port,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Checks `value` against the rule [`Settings::load`] applies to `key`.
///
/// Returns `None` for a key that is not a known setting.
pub fn is_valid_setting(key: &str, value: &str) -> Option<bool> {
    let valid = match key {
        "chunk_seconds" => parses(value, valid_chunk),
        "reference_minutes_per_day" | "tick_interval_ms" => parses(value, positive),
        "history_retention" => parses::<usize>(value, any),
        "day_boundary" => parses::<DayBoundary>(value, any),
        "server_port" => parses::<u16>(value, |v| *v > 0),
        _ => return None,
    };
    Some(valid)
}

fn parses<T: FromStr>(value: &str, valid: impl Fn(&T) -> bool) -> bool {
    value.trim().parse::<T>().is_ok_and(|v| valid(&v))
}

fn positive(v: &u64) -> bool {
    *v > 0
}

// A chunk longer than a day would be rejected by the ledger.
fn valid_chunk(v: &u64) -> bool {
    *v > 0 && *v <= MAX_RECORD_SECONDS
}

fn any<T>(_: &T) -> bool {
    true
}

fn read_setting<T>(db: &Database, key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + Display,
{
    let raw = match db.get_config(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::warn!(key, %default, "Missing config setting, using default");
            return default;
        }
        Err(e) => {
            tracing::warn!(?e, key, %default, "Failed to read config setting, using default");
            return default;
        }
    };

    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            tracing::warn!(key, value = %raw, %default, "Invalid config setting, using default");
            default
        }
    }
}

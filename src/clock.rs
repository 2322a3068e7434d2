//! Calendar time source.
//!
//! Timers stamp flushed chunks with "today" and reports enumerate days
//! back from it. Both go through [`Clock`] so the day boundary is decided
//! in one place and tests can pin the date.

use chrono::{Local, NaiveDate, Utc};
use std::str::FromStr;
use std::sync::Mutex;

/// Source of the current calendar date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Which calendar a "day" follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    /// Days roll over at UTC midnight.
    #[default]
    Utc,
    /// Days roll over at local midnight.
    Local,
}

impl FromStr for DayBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utc" => Ok(DayBoundary::Utc),
            "local" => Ok(DayBoundary::Local),
            other => Err(format!("Unknown day boundary: {}", other)),
        }
    }
}

impl std::fmt::Display for DayBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DayBoundary::Utc => write!(f, "utc"),
            DayBoundary::Local => write!(f, "local"),
        }
    }
}

/// Wall-clock backed [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    boundary: DayBoundary,
}

impl SystemClock {
    pub fn new(boundary: DayBoundary) -> Self {
        Self { boundary }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        match self.boundary {
            DayBoundary::Utc => Utc::now().date_naive(),
            DayBoundary::Local => Local::now().date_naive(),
        }
    }
}

/// A clock pinned to a settable date. Used for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    date: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Mutex::new(date),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        if let Ok(mut current) = self.date.lock() {
            *current = date;
        }
    }

    /// Moves the pinned date forward by `days`.
    pub fn advance_days(&self, days: u64) {
        if let Ok(mut current) = self.date.lock() {
            if let Some(next) = current.checked_add_days(chrono::Days::new(days)) {
                *current = next;
            }
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        match self.date.lock() {
            Ok(date) => *date,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

//! Wall-clock access.
//!
//! The day key is the host's local calendar date; the scheduler works on UTC
//! instants. Both come from one [`Clock`] so tests can pin them together.

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::sync::Mutex;

/// Format of a day key, e.g. `2025-03-14`.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current UTC instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current local calendar date as a day key.
    fn today(&self) -> String;
}

/// Clock backed by the system time and the host's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> String {
        Local::now().format(DAY_KEY_FORMAT).to_string()
    }
}

/// Manually driven clock. The day key is the UTC date of the stored instant.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    /// Advance the clock by `delta`.
    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn today(&self) -> String {
        day_key(self.now().date_naive())
    }
}

/// Format a date as a day key.
pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Parse a day key back into a date. Returns `None` for malformed keys.
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DAY_KEY_FORMAT).ok()
}

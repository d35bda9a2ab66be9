//! UTC offsets and reminder hour derivation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Local hour at which the daily reminder targets the user.
pub const REMINDER_LOCAL_HOUR: u8 = 8;

/// Smallest accepted offset in hours.
pub const MIN_OFFSET: i8 = -12;
/// Largest accepted offset in hours.
pub const MAX_OFFSET: i8 = 14;

/// A whole-hour distance from UTC, always within `-12..=14`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "i8")]
pub struct TimezoneOffset(i8);

impl TimezoneOffset {
    pub const UTC: Self = Self(0);

    /// Validate an offset in hours.
    pub fn new(hours: i64) -> Result<Self, ValidationError> {
        if hours < i64::from(MIN_OFFSET) || hours > i64::from(MAX_OFFSET) {
            return Err(ValidationError::TimezoneOutOfRange { offset: hours });
        }
        // Range-checked above.
        Ok(Self(hours as i8))
    }

    pub fn hours(self) -> i8 {
        self.0
    }
}

impl From<TimezoneOffset> for i8 {
    fn from(offset: TimezoneOffset) -> Self {
        offset.0
    }
}

impl FromStr for TimezoneOffset {
    type Err = ValidationError;

    /// Accepts `3`, `+3`, `-5` with surrounding whitespace.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let hours: i64 = input
            .trim()
            .parse()
            .map_err(|_| ValidationError::TimezoneNotInteger {
                input: input.to_string(),
            })?;
        Self::new(hours)
    }
}

impl fmt::Display for TimezoneOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UTC{:+}", self.0)
    }
}

/// Lenient deserializer for persisted offsets: anything unusable reads back as UTC.
impl<'de> Deserialize<'de> for TimezoneOffset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let offset = raw
            .as_i64()
            .and_then(|hours| Self::new(hours).ok())
            .unwrap_or_else(|| {
                tracing::warn!("ignoring invalid persisted timezone offset {raw}, using UTC");
                Self::UTC
            });
        Ok(offset)
    }
}

/// UTC hour at which a user at `offset` reaches local `REMINDER_LOCAL_HOUR`.
pub fn fire_hour_utc(offset: TimezoneOffset) -> u8 {
    fire_hour_utc_at(REMINDER_LOCAL_HOUR, offset)
}

/// UTC hour at which a user at `offset` reaches `local_hour`, in `0..=23`.
pub fn fire_hour_utc_at(local_hour: u8, offset: TimezoneOffset) -> u8 {
    let hour = (i16::from(local_hour) - i16::from(offset.hours())).rem_euclid(24);
    // rem_euclid(24) is always in 0..24.
    hour as u8
}

/// Calendar date a user at `offset` sees at `now`.
pub fn local_date(now: DateTime<Utc>, offset: TimezoneOffset) -> NaiveDate {
    (now + chrono::Duration::hours(i64::from(offset.hours()))).date_naive()
}

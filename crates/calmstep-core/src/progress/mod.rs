//! Per-user program progress.
//!
//! A [`UserRecord`] holds the user's start date, declared UTC offset and one
//! [`DayStatus`] per calendar day the user touched. Records are created on
//! first contact and never deleted.

mod store;

pub use store::ProgressStore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::clock::parse_day_key;
use crate::error::ValidationError;
use crate::timezone::TimezoneOffset;

/// Opaque, stable user identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// Completion flags for one day. Both flags only ever go from false to true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStatus {
    #[serde(default)]
    pub morning: bool,
    #[serde(default)]
    pub evening: bool,
}

impl DayStatus {
    pub fn is_complete(&self) -> bool {
        self.morning && self.evening
    }

    pub fn is_done(&self, phase: Phase) -> bool {
        match phase {
            Phase::Morning => self.morning,
            Phase::Evening => self.evening,
        }
    }

    /// Set the flag for `phase`. Returns `true` if it was not already set.
    pub fn mark(&mut self, phase: Phase) -> bool {
        let flag = match phase {
            Phase::Morning => &mut self.morning,
            Phase::Evening => &mut self.evening,
        };
        let changed = !*flag;
        *flag = true;
        changed
    }
}

/// The two daily practice blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Morning,
    Evening,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Morning => f.write_str("morning"),
            Phase::Evening => f.write_str("evening"),
        }
    }
}

impl FromStr for Phase {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Phase::Morning),
            "evening" => Ok(Phase::Evening),
            _ => Err(ValidationError::UnknownPhase {
                input: input.to_string(),
            }),
        }
    }
}

/// What the next free-text message from the user is expected to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingTimezone,
}

impl ConversationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Idle)
    }
}

/// Persisted state of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub start_date: String,
    #[serde(default)]
    pub timezone_offset: TimezoneOffset,
    #[serde(default)]
    pub days: BTreeMap<String, DayStatus>,
    #[serde(default, skip_serializing_if = "ConversationState::is_idle")]
    pub conversation: ConversationState,
}

impl UserRecord {
    /// Fresh record starting on `start_date` at UTC.
    pub fn new(start_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            timezone_offset: TimezoneOffset::UTC,
            days: BTreeMap::new(),
            conversation: ConversationState::Idle,
        }
    }

    pub fn stats(&self) -> Stats {
        Stats {
            completed_days: self.days.values().filter(|d| d.is_complete()).count(),
            total_days: self.days.len(),
        }
    }

    /// 1-based program day that `today` falls on. Dates before the start
    /// count as day 1. `None` if either date is not a valid day key.
    pub fn program_day(&self, today: &str) -> Option<u32> {
        let start = parse_day_key(&self.start_date)?;
        let today = parse_day_key(today)?;
        let elapsed = (today - start).num_days().max(0);
        u32::try_from(elapsed).ok().map(|days| days.saturating_add(1))
    }
}

/// Whole persisted dataset keyed by user id.
pub type Dataset = BTreeMap<UserId, UserRecord>;

/// Completion summary for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Days with both phases done.
    pub completed_days: usize,
    /// Days the user touched at all.
    pub total_days: usize,
}

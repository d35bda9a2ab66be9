//! # calmstep Core Library
//!
//! Tracks each user's daily progress through a fixed-length self-guided
//! program and fires a morning reminder at the UTC hour that matches the
//! user's declared offset.
//!
//! ## Architecture
//!
//! - **Progress**: per-user, per-day completion flags with lazy day creation
//!   and idempotent marking, behind a single dataset lock
//! - **Storage**: pluggable backends (JSON file, SQLite, memory) and
//!   TOML-based configuration
//! - **Reminders**: one trigger per user, rebuilt from persisted offsets at
//!   startup and replaced whenever the offset changes
//! - **Service**: the façade the messaging layer talks to
//!
//! ## Key Components
//!
//! - [`ProgressStore`]: durable user records
//! - [`ReminderScheduler`]: daily trigger loop
//! - [`ProgramService`]: onboarding, today's task, marking, timezone, stats
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod progress;
pub mod reminder;
pub mod service;
pub mod storage;
pub mod timezone;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, NotifyError, StorageError, ValidationError};
pub use progress::{ConversationState, DayStatus, Phase, ProgressStore, Stats, UserId, UserRecord};
pub use reminder::{Notifier, Reminder, ReminderJob, ReminderScheduler, ScheduleTable};
pub use service::{Onboarding, ProgramService, TextOutcome, TimezoneUpdate, TodayTask};
pub use storage::{Config, JsonFileStorage, MemoryStorage, SqliteStorage, Storage};
pub use timezone::{fire_hour_utc, fire_hour_utc_at, TimezoneOffset};

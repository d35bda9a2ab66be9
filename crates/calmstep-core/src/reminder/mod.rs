//! Daily morning reminders.
//!
//! Each user has at most one [`ReminderJob`]: the UTC hour at which their
//! local morning hour arrives. Jobs are a projection of the persisted
//! timezone offset and are rebuilt from the progress store at startup.

mod scheduler;
mod table;

pub use scheduler::ReminderScheduler;
pub use table::{ScheduleTable, ScheduledReminder};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::progress::UserId;
use crate::timezone::TimezoneOffset;

/// One user's recurring trigger, passed around by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderJob {
    pub user_id: UserId,
    /// UTC hour of day, `0..=23`.
    pub fire_hour: u8,
    /// Offset the fire hour was derived from. Decides which local day a fire
    /// counts for.
    pub offset: TimezoneOffset,
}

/// What the notifier is asked to deliver. Rendering the text is up to the
/// notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub user_id: UserId,
    /// User-local hour the reminder targets.
    pub local_hour: u8,
    /// 1-based day within the program, or `None` when the record is gone.
    pub program_day: Option<u32>,
    pub program_length: u32,
}

/// Delivery capability supplied by the messaging layer.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, reminder: &Reminder) -> Result<(), NotifyError>;
}

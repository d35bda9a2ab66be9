//! Reminder scheduler background loop.
//!
//! Spawns a tokio task that wakes every tick interval, collects users whose
//! fire hour has arrived and hands each one to the [`Notifier`]. Delivery
//! failures are logged and left for the next day's fire.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{Notifier, Reminder, ReminderJob, ScheduleTable};
use crate::clock::Clock;
use crate::error::StorageError;
use crate::progress::{ProgressStore, UserId, UserRecord};
use crate::storage::{ProgramConfig, RemindersConfig};
use crate::timezone::{fire_hour_utc_at, REMINDER_LOCAL_HOUR};

/// Default interval between scheduler ticks.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Default program length in days.
const DEFAULT_PROGRAM_LENGTH: u32 = 30;

/// Keeps exactly one daily trigger per known user.
pub struct ReminderScheduler {
    store: Arc<ProgressStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    table: Mutex<ScheduleTable>,
    local_hour: u8,
    program_length: u32,
    tick_interval: Duration,
    shutdown: watch::Sender<bool>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<ProgressStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            store,
            notifier,
            clock,
            table: Mutex::new(ScheduleTable::new()),
            local_hour: REMINDER_LOCAL_HOUR,
            program_length: DEFAULT_PROGRAM_LENGTH,
            tick_interval: DEFAULT_TICK_INTERVAL,
            shutdown,
        }
    }

    /// Apply reminder and program settings from configuration.
    pub fn with_config(self, reminders: &RemindersConfig, program: &ProgramConfig) -> Self {
        self.with_local_hour(reminders.local_hour)
            .with_tick_interval(Duration::from_secs(reminders.tick_interval_secs))
            .with_program_length(program.length_days)
    }

    /// Target a different user-local hour. Values past 23 wrap.
    pub fn with_local_hour(mut self, hour: u8) -> Self {
        self.local_hour = hour % 24;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_program_length(mut self, days: u32) -> Self {
        self.program_length = days.max(1);
        self
    }

    fn table(&self) -> MutexGuard<'_, ScheduleTable> {
        // The table is valid after every mutation, so a poisoned lock is safe to reuse.
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn job_for(&self, user_id: &UserId, record: &UserRecord) -> ReminderJob {
        ReminderJob {
            user_id: user_id.clone(),
            fire_hour: fire_hour_utc_at(self.local_hour, record.timezone_offset),
            offset: record.timezone_offset,
        }
    }

    /// Recompute `user_id`'s trigger from the persisted offset and swap it in.
    ///
    /// The table lock is held across the read so two concurrent reschedules
    /// for the same user cannot install an older offset last. Users without a
    /// record lose their trigger.
    pub fn reschedule(&self, user_id: &UserId) -> Result<Option<ReminderJob>, StorageError> {
        let mut table = self.table();
        let Some(record) = self.store.get(user_id)? else {
            if table.remove(user_id).is_some() {
                debug!("removed reminder for unknown user {user_id}");
            }
            return Ok(None);
        };

        let job = self.job_for(user_id, &record);
        match table.upsert(job.clone()) {
            Some(old) if old == job => {}
            Some(old) => info!(
                "user {user_id}: reminder moved from {:02}:00 to {:02}:00 UTC",
                old.fire_hour, job.fire_hour
            ),
            None => info!(
                "user {user_id}: reminder scheduled at {:02}:00 UTC",
                job.fire_hour
            ),
        }
        Ok(Some(job))
    }

    /// Rebuild every trigger from persisted state. Returns the job count.
    pub fn reschedule_all(&self) -> Result<usize, StorageError> {
        let mut table = self.table();
        let users = self.store.users()?;
        table.replace_all(users.iter().map(|(id, record)| self.job_for(id, record)));
        info!("restored {} reminder(s)", table.len());
        Ok(table.len())
    }

    /// Current triggers, sorted by user id.
    pub fn jobs(&self) -> Vec<ReminderJob> {
        self.table().jobs()
    }

    pub fn job(&self, user_id: &UserId) -> Option<ReminderJob> {
        self.table().get(user_id).map(|entry| entry.job.clone())
    }

    fn reminder_for(&self, user_id: &UserId) -> Reminder {
        let today = self.clock.today();
        let program_day = match self.store.get(user_id) {
            Ok(record) => record.and_then(|r| r.program_day(&today)),
            Err(e) => {
                warn!("cannot load user {user_id} for reminder: {e}");
                None
            }
        };
        Reminder {
            user_id: user_id.clone(),
            local_hour: self.local_hour,
            program_day,
            program_length: self.program_length,
        }
    }

    /// Fire every trigger due at `now`. Returns how many were delivered.
    pub async fn tick(&self, now: DateTime<Utc>) -> usize {
        let due = self.table().take_due(now);
        let mut delivered = 0;

        for user_id in due {
            let reminder = self.reminder_for(&user_id);
            match self.notifier.send(&reminder).await {
                Ok(()) => {
                    delivered += 1;
                    debug!("reminder delivered to user {user_id}");
                }
                Err(e) => warn!("reminder for user {user_id} not delivered: {e}"),
            }
        }
        delivered
    }

    /// Start the scheduler background loop.
    pub fn run(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            info!(
                "reminder scheduler started with {} job(s), ticking every {:?}",
                self.table().len(),
                self.tick_interval
            );
            let mut interval = tokio::time::interval(self.tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let stopping = *shutdown_rx.borrow();
                if stopping {
                    break;
                }
                tokio::select! {
                    _ = interval.tick() => {
                        let now = self.clock.now();
                        self.tick(now).await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            info!("reminder scheduler stopped");
        })
    }

    /// Ask a running loop to stop after its current tick.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

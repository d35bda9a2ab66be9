//! Program façade used by the messaging layer.
//!
//! [`ProgramService`] holds no state of its own. Every call delegates to the
//! [`ProgressStore`], and timezone changes are followed by a reschedule on the
//! [`ReminderScheduler`] once the new offset is persisted.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::Result;
use crate::progress::{ConversationState, DayStatus, Phase, ProgressStore, Stats, UserId, UserRecord};
use crate::reminder::{Notifier, ReminderJob, ReminderScheduler};
use crate::storage::{open_storage, Config};
use crate::timezone::TimezoneOffset;

/// Result of a first-contact call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Onboarding {
    pub record: UserRecord,
    pub created: bool,
}

/// Today's entry for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayTask {
    /// Day key for today.
    pub date: String,
    /// Whether today's entry was created by this call.
    pub is_new_day: bool,
    pub program_day: Option<u32>,
    pub program_length: u32,
    pub status: DayStatus,
}

impl TodayTask {
    /// Whether today falls after the last program day.
    pub fn is_past_program(&self) -> bool {
        self.program_day
            .is_some_and(|day| day > self.program_length)
    }
}

/// Outcome of a timezone change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneUpdate {
    pub offset: TimezoneOffset,
    pub job: Option<ReminderJob>,
}

/// What a free-text message from the user turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    TimezoneUpdated(TimezoneUpdate),
    /// Nothing was waiting for free text.
    Ignored,
}

pub struct ProgramService {
    store: Arc<ProgressStore>,
    scheduler: Arc<ReminderScheduler>,
    clock: Arc<dyn Clock>,
    program_length: u32,
}

impl ProgramService {
    pub fn new(
        store: Arc<ProgressStore>,
        scheduler: Arc<ReminderScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            scheduler,
            clock,
            program_length: 30,
        }
    }

    pub fn with_program_length(mut self, days: u32) -> Self {
        self.program_length = days.max(1);
        self
    }

    /// Wire storage, store, scheduler and service from configuration.
    ///
    /// # Errors
    /// Returns an error if the configured storage cannot be opened.
    pub fn from_config(
        config: &Config,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let storage = open_storage(&config.storage)?;
        let store = Arc::new(ProgressStore::new(storage, clock.clone()));
        let scheduler = Arc::new(
            ReminderScheduler::new(store.clone(), notifier, clock.clone())
                .with_config(&config.reminders, &config.program),
        );
        Ok(Self::new(store, scheduler, clock).with_program_length(config.program.length_days))
    }

    pub fn store(&self) -> &Arc<ProgressStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<ReminderScheduler> {
        &self.scheduler
    }

    pub fn program_length(&self) -> u32 {
        self.program_length
    }

    /// First contact. Returns the existing record if the user already started.
    pub fn onboard(&self, user: &UserId) -> Result<Onboarding> {
        let today = self.clock.today();
        let (record, created) = self.store.get_or_create(user, &today)?;
        if created {
            self.scheduler.reschedule(user)?;
        }
        Ok(Onboarding { record, created })
    }

    /// Open today's entry, creating the user and the day if needed.
    pub fn today_task(&self, user: &UserId) -> Result<TodayTask> {
        let today = self.clock.today();
        let (record, user_created) = self.store.get_or_create(user, &today)?;
        if user_created {
            self.scheduler.reschedule(user)?;
        }
        let (status, is_new_day) = self.store.ensure_day(user, &today)?;

        Ok(TodayTask {
            program_day: record.program_day(&today),
            program_length: self.program_length,
            date: today,
            is_new_day,
            status,
        })
    }

    /// Mark `phase` done for today.
    pub fn mark_done(&self, user: &UserId, phase: Phase) -> Result<DayStatus> {
        let today = self.clock.today();
        let status = self.store.mark(user, &today, phase)?;
        // Marking may be a user's first contact.
        if self.scheduler.job(user).is_none() {
            self.scheduler.reschedule(user)?;
        }
        Ok(status)
    }

    /// Validate and store a new offset, then move the user's reminder.
    pub fn update_timezone(&self, user: &UserId, hours: i64) -> Result<TimezoneUpdate> {
        let offset = TimezoneOffset::new(hours)?;
        self.apply_timezone(user, offset)
    }

    /// Same as [`update_timezone`](Self::update_timezone) for raw user text
    /// such as `"+3"`.
    pub fn update_timezone_from_text(&self, user: &UserId, input: &str) -> Result<TimezoneUpdate> {
        let offset: TimezoneOffset = input.parse()?;
        self.apply_timezone(user, offset)
    }

    fn apply_timezone(&self, user: &UserId, offset: TimezoneOffset) -> Result<TimezoneUpdate> {
        let record = self.store.set_timezone(user, offset)?;
        let job = self.scheduler.reschedule(user)?;
        Ok(TimezoneUpdate {
            offset: record.timezone_offset,
            job,
        })
    }

    /// Expect the user's next free-text message to be a timezone offset.
    pub fn request_timezone(&self, user: &UserId) -> Result<UserRecord> {
        Ok(self
            .store
            .set_conversation(user, ConversationState::AwaitingTimezone)?)
    }

    /// Route a free-text message according to the user's conversation state.
    /// Invalid timezone text is rejected and the user keeps being asked.
    pub fn handle_text(&self, user: &UserId, text: &str) -> Result<TextOutcome> {
        let awaiting = self
            .store
            .get(user)?
            .is_some_and(|r| r.conversation == ConversationState::AwaitingTimezone);
        if !awaiting {
            return Ok(TextOutcome::Ignored);
        }
        let update = self.update_timezone_from_text(user, text)?;
        Ok(TextOutcome::TimezoneUpdated(update))
    }

    /// Completed and total day counts.
    pub fn stats(&self, user: &UserId) -> Result<Stats> {
        Ok(self.store.stats(user)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{CoreError, NotifyError, ValidationError};
    use crate::reminder::Reminder;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct NullNotifier;

    #[async_trait]
    impl Notifier for NullNotifier {
        async fn send(&self, _reminder: &Reminder) -> std::result::Result<(), NotifyError> {
            Ok(())
        }
    }

    fn service() -> (Arc<ManualClock>, ProgramService) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        ));
        let store = Arc::new(ProgressStore::new(
            Arc::new(MemoryStorage::new()),
            clock.clone(),
        ));
        let scheduler = Arc::new(ReminderScheduler::new(
            store.clone(),
            Arc::new(NullNotifier),
            clock.clone(),
        ));
        let service = ProgramService::new(store, scheduler, clock.clone());
        (clock, service)
    }

    #[test]
    fn onboard_creates_once_and_schedules() {
        let (_, service) = service();
        let id = UserId::from("1");

        let first = service.onboard(&id).unwrap();
        assert!(first.created);
        assert_eq!(first.record.start_date, "2025-03-10");
        assert_eq!(service.scheduler().job(&id).unwrap().fire_hour, 8);

        assert!(!service.onboard(&id).unwrap().created);
        assert_eq!(service.scheduler().jobs().len(), 1);
    }

    #[test]
    fn today_task_reports_new_day_once() {
        let (clock, service) = service();
        let id = UserId::from("1");

        let task = service.today_task(&id).unwrap();
        assert!(task.is_new_day);
        assert_eq!(task.date, "2025-03-10");
        assert_eq!(task.program_day, Some(1));
        assert!(!service.today_task(&id).unwrap().is_new_day);

        clock.advance(chrono::Duration::days(2));
        let task = service.today_task(&id).unwrap();
        assert!(task.is_new_day);
        assert_eq!(task.program_day, Some(3));
        assert!(!task.is_past_program());
    }

    #[test]
    fn past_program_is_flagged() {
        let (clock, service) = service();
        let service = service.with_program_length(3);
        let id = UserId::from("1");
        service.onboard(&id).unwrap();

        clock.advance(chrono::Duration::days(3));
        let task = service.today_task(&id).unwrap();
        assert_eq!(task.program_day, Some(4));
        assert!(task.is_past_program());
    }

    #[test]
    fn mark_done_is_idempotent_and_feeds_stats() {
        let (_, service) = service();
        let id = UserId::from("1");

        service.mark_done(&id, Phase::Morning).unwrap();
        service.mark_done(&id, Phase::Morning).unwrap();
        assert_eq!(
            service.stats(&id).unwrap(),
            Stats {
                completed_days: 0,
                total_days: 1
            }
        );

        let status = service.mark_done(&id, Phase::Evening).unwrap();
        assert!(status.is_complete());
        assert_eq!(service.stats(&id).unwrap().completed_days, 1);
    }

    #[test]
    fn update_timezone_reschedules() {
        let (_, service) = service();
        let id = UserId::from("1");

        let update = service.update_timezone(&id, 3).unwrap();
        assert_eq!(update.offset.hours(), 3);
        assert_eq!(update.job.unwrap().fire_hour, 5);

        service.update_timezone(&id, -5).unwrap();
        assert_eq!(service.scheduler().jobs().len(), 1);
        assert_eq!(service.scheduler().job(&id).unwrap().fire_hour, 13);
    }

    #[test]
    fn invalid_timezone_changes_nothing() {
        let (_, service) = service();
        let id = UserId::from("1");
        service.update_timezone(&id, 2).unwrap();
        let before = service.store().get(&id).unwrap();

        let err = service.update_timezone(&id, 20).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::TimezoneOutOfRange { offset: 20 })
        ));
        let err = service.update_timezone_from_text(&id, "two").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::TimezoneNotInteger { .. })
        ));

        assert_eq!(service.store().get(&id).unwrap(), before);
        assert_eq!(service.scheduler().job(&id).unwrap().fire_hour, 6);
    }

    #[test]
    fn conversation_routes_timezone_reply() {
        let (_, service) = service();
        let id = UserId::from("1");

        assert_eq!(service.handle_text(&id, "+3").unwrap(), TextOutcome::Ignored);

        service.request_timezone(&id).unwrap();
        assert!(service.handle_text(&id, "later").is_err());
        assert_eq!(
            service.store().get(&id).unwrap().unwrap().conversation,
            ConversationState::AwaitingTimezone
        );

        match service.handle_text(&id, " +3 ").unwrap() {
            TextOutcome::TimezoneUpdated(update) => {
                assert_eq!(update.offset.hours(), 3);
                assert_eq!(update.job.unwrap().fire_hour, 5);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(
            service.store().get(&id).unwrap().unwrap().conversation,
            ConversationState::Idle
        );
        assert_eq!(service.handle_text(&id, "5").unwrap(), TextOutcome::Ignored);
    }
}

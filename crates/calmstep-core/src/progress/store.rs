use std::sync::{Arc, Mutex, MutexGuard};

use super::{ConversationState, DayStatus, Phase, Stats, UserId, UserRecord};
use crate::clock::Clock;
use crate::error::StorageError;
use crate::storage::Storage;
use crate::timezone::TimezoneOffset;

/// Durable per-user progress with get-or-create semantics.
///
/// Every operation is one critical section: the dataset lock is held from
/// the load through the save, so concurrent callers never lose each other's
/// updates even when the backend rewrites the whole dataset.
pub struct ProgressStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl ProgressStore {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        Ok(self.lock.lock()?)
    }

    /// Load `id` or build a fresh record starting on `today`. The boolean
    /// reports whether the record is new (not yet saved).
    fn load_or_new(&self, id: &UserId, today: &str) -> Result<(UserRecord, bool), StorageError> {
        match self.storage.load_user(id)? {
            Some(record) => Ok((record, false)),
            None => Ok((UserRecord::new(today), true)),
        }
    }

    fn save(&self, id: &UserId, record: &UserRecord) -> Result<(), StorageError> {
        self.storage.save_user(id, record)
    }

    /// Existing record, or a new one starting on `today`, persisted on creation.
    pub fn get_or_create(
        &self,
        id: &UserId,
        today: &str,
    ) -> Result<(UserRecord, bool), StorageError> {
        let _guard = self.guard()?;
        let (record, created) = self.load_or_new(id, today)?;
        if created {
            self.save(id, &record)?;
            tracing::info!("user {id} started the program on {today}");
        }
        Ok((record, created))
    }

    /// Read a record without creating it.
    pub fn get(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        let _guard = self.guard()?;
        self.storage.load_user(id)
    }

    /// Status for `date`, creating an empty one if the user never touched it.
    /// Existing flags are never overwritten; nothing is written unless
    /// something was created.
    pub fn ensure_day(&self, id: &UserId, date: &str) -> Result<(DayStatus, bool), StorageError> {
        let _guard = self.guard()?;
        let (mut record, user_created) = self.load_or_new(id, date)?;

        if let Some(status) = record.days.get(date) {
            let status = *status;
            if user_created {
                self.save(id, &record)?;
            }
            return Ok((status, false));
        }

        let status = DayStatus::default();
        record.days.insert(date.to_string(), status);
        self.save(id, &record)?;
        tracing::debug!("user {id}: opened day {date}");
        Ok((status, true))
    }

    /// Set `phase` done for `date`. Marking an already-done phase is a no-op
    /// as far as the resulting state goes.
    pub fn mark(&self, id: &UserId, date: &str, phase: Phase) -> Result<DayStatus, StorageError> {
        let _guard = self.guard()?;
        let (mut record, _) = self.load_or_new(id, date)?;

        let day = record.days.entry(date.to_string()).or_default();
        let changed = day.mark(phase);
        let status = *day;

        self.save(id, &record)?;
        if changed {
            tracing::info!("user {id}: {phase} done for {date}");
        }
        Ok(status)
    }

    pub fn mark_morning(&self, id: &UserId, date: &str) -> Result<DayStatus, StorageError> {
        self.mark(id, date, Phase::Morning)
    }

    pub fn mark_evening(&self, id: &UserId, date: &str) -> Result<DayStatus, StorageError> {
        self.mark(id, date, Phase::Evening)
    }

    /// Store a validated offset and leave any timezone prompt. Returns the
    /// record as persisted.
    pub fn set_timezone(
        &self,
        id: &UserId,
        offset: TimezoneOffset,
    ) -> Result<UserRecord, StorageError> {
        let _guard = self.guard()?;
        let today = self.clock.today();
        let (mut record, _) = self.load_or_new(id, &today)?;

        record.timezone_offset = offset;
        record.conversation = ConversationState::Idle;
        self.save(id, &record)?;
        tracing::info!("user {id}: timezone set to {offset}");
        Ok(record)
    }

    /// Persist the user's conversation state.
    pub fn set_conversation(
        &self,
        id: &UserId,
        state: ConversationState,
    ) -> Result<UserRecord, StorageError> {
        let _guard = self.guard()?;
        let today = self.clock.today();
        let (mut record, created) = self.load_or_new(id, &today)?;

        if created || record.conversation != state {
            record.conversation = state;
            self.save(id, &record)?;
        }
        Ok(record)
    }

    /// Completed and total day counts. Unknown users report zero and are not created.
    pub fn stats(&self, id: &UserId) -> Result<Stats, StorageError> {
        let _guard = self.guard()?;
        Ok(self
            .storage
            .load_user(id)?
            .map(|record| record.stats())
            .unwrap_or_default())
    }

    /// Snapshot of every known user.
    pub fn users(&self) -> Result<Vec<(UserId, UserRecord)>, StorageError> {
        let _guard = self.guard()?;
        Ok(self.storage.load_all()?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStorage;
    use chrono::{TimeZone, Utc};

    fn store() -> ProgressStore {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap());
        ProgressStore::new(Arc::new(MemoryStorage::new()), Arc::new(clock))
    }

    #[test]
    fn get_or_create_sets_defaults_once() {
        let store = store();
        let id = UserId::from("1");

        let (record, created) = store.get_or_create(&id, "2025-03-01").unwrap();
        assert!(created);
        assert_eq!(record.start_date, "2025-03-01");
        assert_eq!(record.timezone_offset, TimezoneOffset::UTC);
        assert!(record.days.is_empty());

        let (again, created) = store.get_or_create(&id, "2025-03-05").unwrap();
        assert!(!created);
        assert_eq!(again.start_date, "2025-03-01");
    }

    #[test]
    fn ensure_day_twice_keeps_flags() {
        let store = store();
        let id = UserId::from("1");

        let (first, created) = store.ensure_day(&id, "2025-03-01").unwrap();
        assert!(created);
        assert_eq!(first, DayStatus::default());

        store.mark_morning(&id, "2025-03-01").unwrap();

        let (second, created) = store.ensure_day(&id, "2025-03-01").unwrap();
        assert!(!created);
        assert!(second.morning);
        assert_eq!(store.get(&id).unwrap().unwrap().days.len(), 1);
    }

    #[test]
    fn marking_twice_equals_marking_once() {
        let store = store();
        let id = UserId::from("1");

        store.mark_morning(&id, "2025-03-01").unwrap();
        let once = store.get(&id).unwrap();
        store.mark_morning(&id, "2025-03-01").unwrap();
        let twice = store.get(&id).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn mark_on_unknown_user_creates_user_and_day() {
        let store = store();
        let id = UserId::from("new");
        let status = store.mark_evening(&id, "2025-03-02").unwrap();
        assert!(status.evening);
        assert!(!status.morning);

        let record = store.get(&id).unwrap().unwrap();
        assert_eq!(record.start_date, "2025-03-02");
    }

    #[test]
    fn stats_counts_fully_completed_days() {
        let store = store();
        let id = UserId::from("1");
        for day in 1..=5 {
            store.ensure_day(&id, &format!("2025-03-0{day}")).unwrap();
        }
        for day in ["2025-03-02", "2025-03-04"] {
            store.mark_morning(&id, day).unwrap();
            store.mark_evening(&id, day).unwrap();
        }
        store.mark_morning(&id, "2025-03-05").unwrap();

        assert_eq!(
            store.stats(&id).unwrap(),
            Stats {
                completed_days: 2,
                total_days: 5
            }
        );
    }

    #[test]
    fn stats_for_unknown_user_does_not_create() {
        let store = store();
        let id = UserId::from("ghost");
        assert_eq!(store.stats(&id).unwrap(), Stats::default());
        assert!(store.get(&id).unwrap().is_none());
    }

    #[test]
    fn set_timezone_clears_prompt_and_uses_clock_for_new_users() {
        let store = store();
        let id = UserId::from("1");
        store
            .set_conversation(&id, ConversationState::AwaitingTimezone)
            .unwrap();

        let record = store
            .set_timezone(&id, TimezoneOffset::new(5).unwrap())
            .unwrap();
        assert_eq!(record.timezone_offset.hours(), 5);
        assert_eq!(record.conversation, ConversationState::Idle);
        assert_eq!(record.start_date, "2025-03-10");
        assert_eq!(store.get(&id).unwrap().unwrap(), record);
    }
}

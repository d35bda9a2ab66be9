use chrono::{DateTime, NaiveDate, Timelike, Utc};
use std::collections::HashMap;

use super::ReminderJob;
use crate::progress::UserId;
use crate::timezone::local_date;

/// A job together with the user-local date it last fired for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledReminder {
    pub job: ReminderJob,
    pub last_fired: Option<NaiveDate>,
}

impl ScheduledReminder {
    fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        local_date(now, self.job.offset)
    }

    fn is_due(&self, now: DateTime<Utc>) -> bool {
        u32::from(self.job.fire_hour) == now.hour() && self.last_fired != Some(self.local_date(now))
    }
}

/// User id -> trigger. One entry per user, ever.
#[derive(Debug, Default, Clone)]
pub struct ScheduleTable {
    entries: HashMap<UserId, ScheduledReminder>,
}

impl ScheduleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `job`, replacing any existing job for the same user. The
    /// previous last-fired date is kept so a replacement cannot fire twice
    /// for one local day. Returns the replaced job.
    pub fn upsert(&mut self, job: ReminderJob) -> Option<ReminderJob> {
        match self.entries.get_mut(&job.user_id) {
            Some(existing) => Some(std::mem::replace(&mut existing.job, job)),
            None => {
                self.entries.insert(
                    job.user_id.clone(),
                    ScheduledReminder {
                        job,
                        last_fired: None,
                    },
                );
                None
            }
        }
    }

    pub fn remove(&mut self, user_id: &UserId) -> Option<ReminderJob> {
        self.entries.remove(user_id).map(|entry| entry.job)
    }

    pub fn get(&self, user_id: &UserId) -> Option<&ScheduledReminder> {
        self.entries.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Jobs sorted by user id.
    pub fn jobs(&self) -> Vec<ReminderJob> {
        let mut jobs: Vec<ReminderJob> = self.entries.values().map(|e| e.job.clone()).collect();
        jobs.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        jobs
    }

    /// Users whose job is due at `now`, each marked fired for their local date.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<UserId> {
        let mut due: Vec<UserId> = self
            .entries
            .values_mut()
            .filter(|entry| entry.is_due(now))
            .map(|entry| {
                entry.last_fired = Some(entry.local_date(now));
                entry.job.user_id.clone()
            })
            .collect();
        due.sort();
        due
    }

    /// Replace every entry with `jobs`, keeping last-fired dates of users
    /// that are still present.
    pub fn replace_all(&mut self, jobs: impl IntoIterator<Item = ReminderJob>) {
        let mut previous = std::mem::take(&mut self.entries);
        for job in jobs {
            let last_fired = previous.remove(&job.user_id).and_then(|e| e.last_fired);
            self.entries
                .insert(job.user_id.clone(), ScheduledReminder { job, last_fired });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timezone::{fire_hour_utc, TimezoneOffset};
    use chrono::TimeZone;

    /// Job for a user at `hours` from UTC, firing at local 08:00.
    fn job(user: &str, hours: i64) -> ReminderJob {
        let offset = TimezoneOffset::new(hours).unwrap();
        ReminderJob {
            user_id: UserId::from(user),
            fire_hour: fire_hour_utc(offset),
            offset,
        }
    }

    fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, min, 0).unwrap()
    }

    #[test]
    fn upsert_replaces_instead_of_duplicating() {
        let mut table = ScheduleTable::new();
        assert_eq!(table.upsert(job("1", 2)), None);
        assert_eq!(table.upsert(job("1", 5)), Some(job("1", 2)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.jobs(), vec![job("1", 5)]);
    }

    #[test]
    fn fires_once_per_day_within_the_hour() {
        let mut table = ScheduleTable::new();
        table.upsert(job("1", 3));
        table.upsert(job("2", -5));

        assert!(table.take_due(at(1, 4, 59)).is_empty());
        assert_eq!(table.take_due(at(1, 5, 0)), vec![UserId::from("1")]);
        assert!(table.take_due(at(1, 5, 1)).is_empty());
        assert!(table.take_due(at(1, 6, 0)).is_empty());
        assert_eq!(table.take_due(at(2, 5, 30)), vec![UserId::from("1")]);
        assert_eq!(table.take_due(at(2, 13, 0)), vec![UserId::from("2")]);
    }

    #[test]
    fn replacement_on_same_local_day_does_not_fire_again() {
        let mut table = ScheduleTable::new();
        table.upsert(job("1", 3));
        assert_eq!(table.take_due(at(1, 5, 0)).len(), 1);

        // UTC+2 reaches 08:00 an hour later, still on local Mar 1.
        table.upsert(job("1", 2));
        assert!(table.take_due(at(1, 6, 0)).is_empty());
        assert_eq!(table.take_due(at(2, 6, 0)).len(), 1);
    }

    #[test]
    fn moving_east_past_midnight_still_fires_next_local_day() {
        let mut table = ScheduleTable::new();
        table.upsert(job("1", -10));
        // 18:00 UTC Mar 10 is 08:00 local Mar 10.
        assert_eq!(table.take_due(at(10, 18, 0)), vec![UserId::from("1")]);

        table.upsert(job("1", 12));
        // 20:00 UTC Mar 10 is 08:00 local Mar 11.
        assert_eq!(table.take_due(at(10, 20, 0)), vec![UserId::from("1")]);
        assert!(table.take_due(at(10, 20, 30)).is_empty());
        assert_eq!(table.take_due(at(11, 20, 0)), vec![UserId::from("1")]);
    }

    #[test]
    fn moving_west_does_not_repeat_a_local_day() {
        let mut table = ScheduleTable::new();
        table.upsert(job("1", 12));
        // Local Mar 11.
        assert_eq!(table.take_due(at(10, 20, 0)).len(), 1);

        table.upsert(job("1", -10));
        // 18:00 UTC Mar 11 is local Mar 11 again.
        assert!(table.take_due(at(11, 18, 0)).is_empty());
        assert_eq!(table.take_due(at(12, 18, 0)).len(), 1);
    }

    #[test]
    fn replace_all_drops_missing_users_and_keeps_history() {
        let mut table = ScheduleTable::new();
        table.upsert(job("1", 3));
        table.upsert(job("2", 1));
        table.take_due(at(1, 5, 0));

        table.replace_all(vec![job("1", 3), job("3", -1)]);
        assert_eq!(table.jobs(), vec![job("1", 3), job("3", -1)]);
        assert_eq!(
            table.get(&UserId::from("1")).unwrap().last_fired,
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert!(table.get(&UserId::from("2")).is_none());
    }

    #[test]
    fn remove_returns_job() {
        let mut table = ScheduleTable::new();
        table.upsert(job("1", 3));
        assert_eq!(table.remove(&UserId::from("1")), Some(job("1", 3)));
        assert!(table.is_empty());
        assert_eq!(table.remove(&UserId::from("1")), None);
    }
}

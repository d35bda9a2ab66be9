//! SQLite-backed progress storage.
//!
//! One row per user in `users`, one row per touched day in `days`.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use super::{migrations, Storage};
use crate::error::StorageError;
use crate::progress::{ConversationState, Dataset, DayStatus, UserId, UserRecord};
use crate::timezone::TimezoneOffset;

/// SQLite database for user progress.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path` and apply migrations.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if migration fails.
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        migrations::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn conversation_to_sql(state: ConversationState) -> &'static str {
    match state {
        ConversationState::Idle => "idle",
        ConversationState::AwaitingTimezone => "awaiting_timezone",
    }
}

fn conversation_from_sql(value: &str) -> ConversationState {
    match value {
        "awaiting_timezone" => ConversationState::AwaitingTimezone,
        _ => ConversationState::Idle,
    }
}

fn offset_from_sql(user: &str, hours: i64) -> TimezoneOffset {
    TimezoneOffset::new(hours).unwrap_or_else(|_| {
        tracing::warn!("user {user} has invalid stored offset {hours}, using UTC");
        TimezoneOffset::UTC
    })
}

fn load_days(
    conn: &Connection,
    user: &str,
) -> rusqlite::Result<std::collections::BTreeMap<String, DayStatus>> {
    let mut stmt =
        conn.prepare("SELECT day, morning, evening FROM days WHERE user_id = ?1 ORDER BY day")?;
    let rows = stmt.query_map(params![user], |row| {
        Ok((
            row.get::<_, String>(0)?,
            DayStatus {
                morning: row.get(1)?,
                evening: row.get(2)?,
            },
        ))
    })?;
    rows.collect()
}

impl Storage for SqliteStorage {
    fn load_user(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        let conn = self.conn.lock()?;
        let row = conn
            .query_row(
                "SELECT start_date, timezone_offset, conversation FROM users WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((start_date, offset, conversation)) = row else {
            return Ok(None);
        };

        Ok(Some(UserRecord {
            start_date,
            timezone_offset: offset_from_sql(id.as_str(), offset),
            days: load_days(&conn, id.as_str())?,
            conversation: conversation_from_sql(&conversation),
        }))
    }

    fn save_user(&self, id: &UserId, record: &UserRecord) -> Result<(), StorageError> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO users (id, start_date, timezone_offset, conversation)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                timezone_offset = excluded.timezone_offset,
                conversation = excluded.conversation",
            params![
                id.as_str(),
                record.start_date,
                i64::from(record.timezone_offset.hours()),
                conversation_to_sql(record.conversation),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO days (user_id, day, morning, evening)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, day) DO UPDATE SET
                    morning = excluded.morning,
                    evening = excluded.evening",
            )?;
            for (day, status) in &record.days {
                stmt.execute(params![id.as_str(), day, status.morning, status.evening])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn load_all(&self) -> Result<Dataset, StorageError> {
        let conn = self.conn.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, start_date, timezone_offset, conversation FROM users")?;
        let users = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut dataset = Dataset::new();
        for (id, start_date, offset, conversation) in users {
            let record = UserRecord {
                start_date,
                timezone_offset: offset_from_sql(&id, offset),
                days: load_days(&conn, &id)?,
                conversation: conversation_from_sql(&conversation),
            };
            dataset.insert(UserId::new(id), record);
        }
        Ok(dataset)
    }
}

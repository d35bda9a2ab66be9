//! In-memory storage. Nothing survives the process.

use std::sync::Mutex;

use super::Storage;
use crate::error::StorageError;
use crate::progress::{Dataset, UserId, UserRecord};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    users: Mutex<Dataset>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load_user(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        Ok(self.users.lock()?.get(id).cloned())
    }

    fn save_user(&self, id: &UserId, record: &UserRecord) -> Result<(), StorageError> {
        self.users.lock()?.insert(id.clone(), record.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Dataset, StorageError> {
        Ok(self.users.lock()?.clone())
    }
}

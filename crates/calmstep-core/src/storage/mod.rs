//! Persistence backends and configuration.
//!
//! [`Storage`] is the seam between the progress store and where records live.
//! Three backends ship: a single JSON file (the default), SQLite, and an
//! in-memory map for tests and throwaway runs.

mod config;
pub mod database;
pub mod json_file;
pub mod memory;
pub mod migrations;

pub use config::{Config, ProgramConfig, RemindersConfig, StorageBackend, StorageConfig};
pub use database::SqliteStorage;
pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{ConfigError, StorageError};
use crate::progress::{Dataset, UserId, UserRecord};

/// Record-level access to the persisted dataset.
///
/// Implementations need not be transactional across calls; the progress
/// store serializes every read-modify-write sequence itself.
pub trait Storage: Send + Sync {
    /// Load one user's record, if present.
    fn load_user(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError>;

    /// Insert or replace one user's record.
    fn save_user(&self, id: &UserId, record: &UserRecord) -> Result<(), StorageError>;

    /// Load every record.
    fn load_all(&self) -> Result<Dataset, StorageError>;
}

/// Returns `~/.config/calmstep[-dev]/` based on CALMSTEP_ENV.
///
/// Set CALMSTEP_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CALMSTEP_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("calmstep-dev")
    } else {
        base_dir.join("calmstep")
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Open the backend selected by `config`.
///
/// # Errors
/// Returns an error if the data directory or the SQLite database cannot be
/// opened.
pub fn open_storage(config: &StorageConfig) -> crate::error::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        StorageBackend::Json => {
            let path = match &config.path {
                Some(path) => path.clone(),
                None => data_dir()?.join("users_data.json"),
            };
            Arc::new(JsonFileStorage::new(path))
        }
        StorageBackend::Sqlite => {
            let path = match &config.path {
                Some(path) => path.clone(),
                None => data_dir()?.join("calmstep.db"),
            };
            Arc::new(SqliteStorage::open(path)?)
        }
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
    };
    tracing::debug!("opened {:?} storage", config.backend);
    Ok(storage)
}

//! Single-file JSON storage.
//!
//! The whole dataset lives in one pretty-printed JSON object keyed by user id.
//! Writes go through a temp file and a rename so a crash mid-write leaves the
//! previous file intact. A file that cannot be parsed is moved aside to
//! `<name>.corrupt-<timestamp>` and read as an empty dataset.

use std::io::Write;
use std::path::PathBuf;

use super::Storage;
use crate::error::StorageError;
use crate::progress::{Dataset, UserId, UserRecord};

/// Dataset stored in one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_dataset(&self) -> Result<Dataset, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Dataset::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Dataset::new());
        }

        match serde_json::from_slice::<Dataset>(&bytes) {
            Ok(dataset) => Ok(dataset),
            Err(e) => {
                tracing::warn!(
                    "cannot parse {}: {e}; starting from an empty dataset",
                    self.path.display()
                );
                self.quarantine();
                Ok(Dataset::new())
            }
        }
    }

    /// Move an unparsable file to a backup name no earlier backup uses.
    fn quarantine(&self) {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let base = self.path.with_extension(format!("json.corrupt-{stamp}"));
        let mut backup = base.clone();
        let mut n = 1;
        while backup.exists() {
            backup = PathBuf::from(format!("{}.{n}", base.display()));
            n += 1;
        }

        match std::fs::rename(&self.path, &backup) {
            Ok(()) => tracing::warn!("corrupt dataset moved to {}", backup.display()),
            Err(e) => tracing::error!(
                "cannot move corrupt dataset to {}: {e}",
                backup.display()
            ),
        }
    }

    /// Write the dataset atomically (temp file -> fsync -> rename).
    fn write_dataset(&self, dataset: &Dataset) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(dataset)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let mut file =
            std::fs::File::create(&tmp_path).map_err(|e| StorageError::io(&tmp_path, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| StorageError::io(&tmp_path, e))?;
        file.sync_all().map_err(|e| StorageError::io(&tmp_path, e))?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            StorageError::io(&self.path, e)
        })
    }
}

impl Storage for JsonFileStorage {
    fn load_user(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        Ok(self.read_dataset()?.remove(id))
    }

    fn save_user(&self, id: &UserId, record: &UserRecord) -> Result<(), StorageError> {
        let mut dataset = self.read_dataset()?;
        dataset.insert(id.clone(), record.clone());
        self.write_dataset(&dataset)
    }

    fn load_all(&self) -> Result<Dataset, StorageError> {
        self.read_dataset()
    }
}

//! Core error types for calmstep-core.
//!
//! This module defines the error hierarchy using thiserror. Nothing in the
//! core is fatal to the process: every failure surfaces as one of these
//! variants and the caller decides how to report it.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for calmstep-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Rejected user input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Reminder delivery errors
    #[error("Notify error: {0}")]
    Notify(#[from] NotifyError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Storage backend errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem failure while reading or writing the dataset
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dataset could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite query or connection failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A thread panicked while holding the store lock
    #[error("store lock poisoned")]
    Poisoned,
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Timezone input is not a whole number of hours
    #[error("timezone offset must be a whole number of hours, got '{input}'")]
    TimezoneNotInteger { input: String },

    /// Timezone offset outside of -12..=14
    #[error("timezone offset {offset} is out of range (-12..=14)")]
    TimezoneOutOfRange { offset: i64 },

    /// Unknown program phase name
    #[error("unknown phase '{input}', expected 'morning' or 'evening'")]
    UnknownPhase { input: String },
}

/// Notifier delivery errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The transport refused or failed to deliver the reminder
    #[error("delivery to user {user_id} failed: {message}")]
    Delivery { user_id: String, message: String },

    /// The notifier has been shut down
    #[error("notifier closed")]
    Closed,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("cannot prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StorageError::Poisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

pub mod chat;
pub mod config;
pub mod jobs;
pub mod progress;
pub mod serve;

use std::sync::Arc;

use calmstep_core::{Config, ProgramService, SystemClock};

use crate::notifier::StdoutNotifier;

/// Loaded configuration plus the service built from it.
pub struct Context {
    pub config: Config,
    pub service: ProgramService,
}

impl Context {
    /// Load configuration and open the configured storage.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        config.validate()?;
        let service = ProgramService::from_config(
            &config,
            Arc::new(StdoutNotifier),
            Arc::new(SystemClock),
        )?;
        Ok(Self { config, service })
    }

    pub fn local_hour(&self) -> u8 {
        self.config.reminders.local_hour
    }
}

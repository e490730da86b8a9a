use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("target buffer size must be > 0")]
    InvalidTargetBufferSize,

    #[error("mission target must be > 0")]
    InvalidMissionTarget,

    #[error("sync fetch budget must be > 0 seconds")]
    InvalidSyncFetchBudget,
}

/// Tunable parameters for one quiz session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    target_buffer_size: u32,
    mission_target: u32,
    sync_fetch_budget_secs: u64,
}

impl SessionSettings {
    /// Defaults tuned for young learners:
    /// - 4 buffered questions (enough lookahead to hide generation latency)
    /// - 5 correct answers per mission (one train car per short sitting)
    /// - 4 second budget for the emergency synchronous fetch before the
    ///   static fallback takes over
    #[must_use]
    pub fn default_for_young_learners() -> Self {
        Self {
            target_buffer_size: 4,
            mission_target: 5,
            sync_fetch_budget_secs: 4,
        }
    }

    /// Creates custom session settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if any parameter is zero.
    pub fn new(
        target_buffer_size: u32,
        mission_target: u32,
        sync_fetch_budget_secs: u64,
    ) -> Result<Self, SettingsError> {
        if target_buffer_size == 0 {
            return Err(SettingsError::InvalidTargetBufferSize);
        }
        if mission_target == 0 {
            return Err(SettingsError::InvalidMissionTarget);
        }
        if sync_fetch_budget_secs == 0 {
            return Err(SettingsError::InvalidSyncFetchBudget);
        }
        Ok(Self {
            target_buffer_size,
            mission_target,
            sync_fetch_budget_secs,
        })
    }

    #[must_use]
    pub fn target_buffer_size(&self) -> u32 {
        self.target_buffer_size
    }

    #[must_use]
    pub fn mission_target(&self) -> u32 {
        self.mission_target
    }

    /// Upper bound on the emergency synchronous fetch in `requestNext`.
    #[must_use]
    pub fn sync_fetch_budget(&self) -> Duration {
        Duration::from_secs(self.sync_fetch_budget_secs)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::default_for_young_learners()
    }
}

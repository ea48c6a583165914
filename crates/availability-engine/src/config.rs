//! Engine configuration: grid sizes and the session durations offered to students.

use serde::{Deserialize, Serialize};

use crate::error::{AvailabilityError, Result};
use crate::selection::Granularity;

/// Tunables shared by the availability editor and the booking flow.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cell size of the drag-select editor grid.
    pub editor_granularity: Granularity,
    /// Chunk size of bookable slots.
    pub slot_granularity: Granularity,
    /// Durations (minutes) a student can choose from.
    pub session_durations: Vec<u32>,
    pub default_duration: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            editor_granularity: Granularity::FifteenMinutes,
            slot_granularity: Granularity::ThirtyMinutes,
            session_durations: vec![30, 60, 90, 120],
            default_duration: 60,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    /// Returns `AvailabilityError::Json` for malformed JSON or an unsupported
    /// granularity, and `AvailabilityError::InvalidConfig` when validation fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that durations are positive and the default is one of them.
    pub fn validate(&self) -> Result<()> {
        if self.session_durations.is_empty() {
            return Err(AvailabilityError::InvalidConfig(
                "session_durations must not be empty".to_string(),
            ));
        }
        if self.session_durations.contains(&0) {
            return Err(AvailabilityError::InvalidConfig(
                "session durations must be positive".to_string(),
            ));
        }
        if !self.session_durations.contains(&self.default_duration) {
            return Err(AvailabilityError::InvalidConfig(format!(
                "default_duration {} is not one of {:?}",
                self.default_duration, self.session_durations
            )));
        }
        Ok(())
    }

    /// Whether a student may request `duration_minutes`.
    pub fn allows_duration(&self, duration_minutes: u32) -> bool {
        self.session_durations.contains(&duration_minutes)
    }
}

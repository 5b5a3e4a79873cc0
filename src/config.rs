//! Processor configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default minimum gap between two fresh-location broadcasts (3 minutes).
pub const DEFAULT_UPDATE_COOLDOWN_SECS: u64 = 180;

/// Largest accepted update cooldown (one day).
pub const MAX_UPDATE_COOLDOWN_SECS: u64 = 86_400;

/// Default depth of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Largest accepted event channel depth.
pub const MAX_EVENT_CAPACITY: usize = 4096;

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting is out of its allowed range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Settings for [`MessageProcessor`](crate::MessageProcessor).
///
/// # Example
///
/// ```
/// use zood_core::ProcessorConfig;
///
/// let config = ProcessorConfig::from_json(r#"{"update_cooldown_secs":60}"#).unwrap();
/// assert_eq!(config.update_cooldown_secs, 60);
/// assert!(!config.record_share_requests);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Minimum seconds between fresh-location broadcasts triggered by peers.
    pub update_cooldown_secs: u64,

    /// Capacity of the event channel; slow subscribers miss older events.
    pub event_capacity: usize,

    /// Whether incoming sharing requests are recorded and announced.
    ///
    /// Off by default: sharing requests are left to a higher layer.
    pub record_share_requests: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            update_cooldown_secs: DEFAULT_UPDATE_COOLDOWN_SECS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            record_share_requests: false,
        }
    }
}

impl ProcessorConfig {
    /// Checks that every setting is within range.
    ///
    /// # Errors
    ///
    /// Returns an error if the cooldown is zero or above one day, or the event
    /// capacity is zero or above [`MAX_EVENT_CAPACITY`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_cooldown_secs == 0 || self.update_cooldown_secs > MAX_UPDATE_COOLDOWN_SECS {
            return Err(ConfigError::Invalid(format!(
                "update_cooldown_secs must be 1..={MAX_UPDATE_COOLDOWN_SECS}, got {}",
                self.update_cooldown_secs
            )));
        }
        if self.event_capacity == 0 || self.event_capacity > MAX_EVENT_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "event_capacity must be 1..={MAX_EVENT_CAPACITY}, got {}",
                self.event_capacity
            )));
        }
        Ok(())
    }

    /// Returns the update cooldown as a duration.
    #[must_use]
    pub fn update_cooldown(&self) -> Duration {
        let secs = self.update_cooldown_secs.min(MAX_UPDATE_COOLDOWN_SECS);
        Duration::seconds(i64::try_from(secs).unwrap_or(0))
    }

    /// Parses and validates a configuration from JSON.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or a setting is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Converts this configuration to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (extremely rare).
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}

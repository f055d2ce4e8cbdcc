//! Synchronization configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use void_inventory::ConfigError;

/// Timing of the client-side anti-flicker window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How long authoritative state is held back after a local send
    #[serde(rename = "pending_window_ms", with = "duration_ms")]
    pub pending_window: Duration,
    /// Oldest buffered state that is still held back, however often the
    /// window gets reset
    #[serde(rename = "max_staleness_ms", with = "duration_ms")]
    pub max_staleness: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pending_window: Duration::from_secs(1),
            max_staleness: Duration::from_secs(5),
        }
    }
}

impl SyncConfig {
    /// Load from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.max_staleness < config.pending_window {
            return Err(ConfigError::Invalid {
                field: "max_staleness_ms",
                reason: "must not be shorter than the pending window".to_string(),
            });
        }
        Ok(config)
    }

    /// Set pending window
    pub fn with_pending_window(mut self, window: Duration) -> Self {
        self.pending_window = window;
        self
    }

    /// Set staleness bound
    pub fn with_max_staleness(mut self, bound: Duration) -> Self {
        self.max_staleness = bound;
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

//! Inventory configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Tunables of the placement engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Deepest item-in-item nesting the cycle guard will walk before treating
    /// the chain as corrupted
    pub max_nesting_depth: usize,
    /// Keep items used up by a local combine alive, out of every container,
    /// until the authority confirms their destruction. Set on predicting
    /// clients.
    pub withhold_consumed: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 16,
            withhold_consumed: false,
        }
    }
}

impl InventoryConfig {
    /// Load from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the nesting bound
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Set whether consumed items wait for confirmation
    pub fn with_withhold_consumed(mut self, withhold: bool) -> Self {
        self.withhold_consumed = withhold;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_nesting_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

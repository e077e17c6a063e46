use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for the [`InMemoryStore`](crate::InMemoryStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of past change events retained for `since` replay.
    pub history_limit: usize,
    /// Capacity of the change feed shared by all watchers. A watcher that
    /// falls further behind than this is terminated.
    pub channel_capacity: usize,
    /// Per-subscription buffer between the change feed and the consumer.
    pub watch_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            channel_capacity: 1024,
            watch_buffer: 100,
        }
    }
}

impl StoreConfig {
    /// Parse a configuration from TOML. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| StoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every capacity is usable.
    pub fn validate(&self) -> StoreResult<()> {
        for (name, value) in [
            ("history_limit", self.history_limit),
            ("channel_capacity", self.channel_capacity),
            ("watch_buffer", self.watch_buffer),
        ] {
            if value == 0 {
                return Err(StoreError::InvalidConfig(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

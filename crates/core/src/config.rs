//! Runtime configuration for the engine's background schedules.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error loading configuration from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the background schedules.
///
/// Unknown values fall back to defaults field-by-field, so a partial config
/// file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval of the scheduled full cache rebuild (safety net on top of
    /// mutation-driven invalidation). Milliseconds.
    pub cache_rebuild_interval_ms: u64,

    /// Interval of the membership-expiry sweep. Milliseconds.
    pub expiry_check_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_rebuild_interval_ms: 5 * 60 * 1000,
            expiry_check_interval_ms: 5 * 1000,
        }
    }
}

impl EngineConfig {
    pub fn cache_rebuild_interval(&self) -> Duration {
        Duration::from_millis(self.cache_rebuild_interval_ms)
    }

    pub fn expiry_check_interval(&self) -> Duration {
        Duration::from_millis(self.expiry_check_interval_ms)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

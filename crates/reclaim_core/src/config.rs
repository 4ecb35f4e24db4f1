//! # Pool Configuration
//!
//! Loaded once at startup, from TOML:
//!
//! ```toml
//! capacity = 128
//! reuse_order = "lifo"      # or "fifo"
//! report_interval_ms = 500
//! high_water_ratio = 0.75
//! ```
//!
//! Every key is optional and falls back to [`PoolConfig::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Which free entity an allocate picks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReuseOrder {
    /// Most recently freed first. Keeps a small hot set of entities cycling.
    #[default]
    Lifo,
    /// Least recently freed first. Spreads use evenly over all entities.
    Fifo,
}

/// Configuration for an [`ObjectPool`](crate::ObjectPool) and its reporter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum number of entities ever constructed.
    pub capacity: usize,
    /// Free-list order used by allocate.
    pub reuse_order: ReuseOrder,
    /// How often a [`PoolReporter`](crate::PoolReporter) samples statistics (ms).
    pub report_interval_ms: u64,
    /// Utilization at which the reporter warns (0.0 exclusive to 1.0 inclusive).
    pub high_water_ratio: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            reuse_order: ReuseOrder::Lifo,
            report_interval_ms: 1000,
            high_water_ratio: 0.9,
        }
    }
}

impl PoolConfig {
    /// Config with the given capacity and defaults for everything else.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Parses and validates a config from TOML text.
    pub fn from_toml_str(text: &str) -> PoolResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| PoolError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> PoolResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PoolError::Io(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks the values are usable.
    pub fn validate(&self) -> PoolResult<()> {
        if self.capacity == 0 {
            return Err(PoolError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if self.report_interval_ms == 0 {
            return Err(PoolError::InvalidConfig(
                "report_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.high_water_ratio > 0.0 && self.high_water_ratio <= 1.0) {
            return Err(PoolError::InvalidConfig(format!(
                "high_water_ratio must be in (0, 1], got {}",
                self.high_water_ratio
            )));
        }
        Ok(())
    }

    /// Serializes the config back to TOML.
    pub fn to_toml_string(&self) -> PoolResult<String> {
        toml::to_string(self).map_err(|e| PoolError::InvalidConfig(e.to_string()))
    }
}

//! # Cadence Configuration System
//!
//! Typed configuration for the batching and orchestration core, loaded from
//! `config/cadence.toml` with optional per-environment overrides.
//!
//! ## Architecture
//!
//! - **Layered sources**: defaults, then the base file, then `cadence.<env>.toml`, then
//!   `CADENCE_`-prefixed environment variables
//! - **Environment awareness**: `CADENCE_ENV` or `APP_ENV`, defaulting to `development`
//! - **Explicit validation**: non-positive bounds are rejected at load time
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cadence_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let batching = &manager.config().batching;
//! println!("max samples per batch: {}", batching.max_sample_count);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/cadence.toml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Batch planner and cache bounds
    pub batching: BatchingConfig,

    /// Phase sequencer and pipeline dispatch settings
    pub sequencer: SequencerConfig,

    /// Lifecycle event channel
    pub events: EventsConfig,

    /// Structured logging
    pub logging: LoggingConfig,
}

/// Resource bounds for one batch planner.
///
/// `max_sample_count` caps series-count × cadence-count per batch; the planner derives its
/// per-batch series budget from it and the task's cadence range. `max_read_count` caps the
/// identifiers in a single storage read.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchingConfig {
    pub max_sample_count: u64,
    pub max_read_count: usize,
    /// Extend reads with identifiers of upcoming work items and keep them cached
    pub prefetch_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Bundles dispatched concurrently by a task pipeline
    pub max_in_flight_bundles: usize,
    /// Persist the cumulative lineage record when a task completes
    pub persist_cumulative_lineage: bool,
    /// Extra attempts for a bundle whose storage read failed with a retryable error
    pub retry_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Also write JSON records to a daily-rolling file under `log_dir`
    pub json_file: bool,
    pub log_dir: PathBuf,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_sample_count: constants::DEFAULT_MAX_SAMPLE_COUNT,
            max_read_count: constants::DEFAULT_MAX_READ_COUNT,
            prefetch_enabled: true,
        }
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            max_in_flight_bundles: constants::DEFAULT_MAX_IN_FLIGHT_BUNDLES,
            persist_cumulative_lineage: true,
            retry_attempts: constants::DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: constants::DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_file: false,
            log_dir: PathBuf::from("log"),
        }
    }
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            batching: BatchingConfig::default(),
            sequencer: SequencerConfig::default(),
            events: EventsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BatchingConfig {
    /// Small bounds so tests exercise multi-batch and multi-read paths
    pub fn for_test() -> Self {
        Self {
            max_sample_count: 100,
            max_read_count: 10,
            prefetch_enabled: false,
        }
    }

    pub fn with_max_sample_count(mut self, max_sample_count: u64) -> Self {
        self.max_sample_count = max_sample_count;
        self
    }

    pub fn with_max_read_count(mut self, max_read_count: usize) -> Self {
        self.max_read_count = max_read_count;
        self
    }

    pub fn with_prefetch(mut self, enabled: bool) -> Self {
        self.prefetch_enabled = enabled;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_sample_count == 0 {
            return Err(ConfigurationError::invalid_value(
                "batching.max_sample_count",
                "0",
                "max sample count must be greater than 0",
            ));
        }
        if self.max_read_count == 0 {
            return Err(ConfigurationError::invalid_value(
                "batching.max_read_count",
                "0",
                "max read count must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl CadenceConfig {
    pub fn for_test() -> Self {
        Self {
            batching: BatchingConfig::for_test(),
            sequencer: SequencerConfig {
                max_in_flight_bundles: 2,
                persist_cumulative_lineage: true,
                retry_attempts: 1,
            },
            events: EventsConfig {
                channel_capacity: 64,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                ..LoggingConfig::default()
            },
        }
    }

    /// Validate configuration for consistency and required fields
    pub fn validate(&self) -> ConfigResult<()> {
        self.batching.validate()?;

        if self.sequencer.max_in_flight_bundles == 0 {
            return Err(ConfigurationError::invalid_value(
                "sequencer.max_in_flight_bundles",
                "0",
                "at least one bundle must be allowed in flight",
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                "0",
                "broadcast channel capacity must be greater than 0",
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "logging.level",
                "logging configuration",
            ));
        }

        if self.logging.json_file && self.logging.log_dir.as_os_str().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "logging.log_dir",
                "json file logging is enabled",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CadenceConfig::default().validate().is_ok());
        assert!(CadenceConfig::for_test().validate().is_ok());
    }

    #[test]
    fn test_zero_read_count_rejected() {
        let config = BatchingConfig::default().with_max_read_count(0);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidValue { ref field, .. } if field == "batching.max_read_count"
        ));
    }

    #[test]
    fn test_zero_in_flight_rejected() {
        let mut config = CadenceConfig::for_test();
        config.sequencer.max_in_flight_bundles = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: CadenceConfig = serde_json::from_value(serde_json::json!({
            "batching": { "max_read_count": 7 }
        }))
        .unwrap();
        assert_eq!(config.batching.max_read_count, 7);
        assert_eq!(
            config.batching.max_sample_count,
            constants::DEFAULT_MAX_SAMPLE_COUNT
        );
        assert_eq!(config.events, EventsConfig::default());
    }
}

//! Shared defaults and names used across the crate.

/// Default budget of series-count × cadence-count per batch
pub const DEFAULT_MAX_SAMPLE_COUNT: u64 = 20_000_000;

/// Default maximum number of identifiers per storage read
pub const DEFAULT_MAX_READ_COUNT: usize = 25_000;

/// Default number of bundles dispatched concurrently by a task pipeline
pub const DEFAULT_MAX_IN_FLIGHT_BUNDLES: usize = 4;

/// Default extra attempts for a bundle after a retryable storage failure
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 2;

/// Default capacity of the lifecycle event broadcast channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Base name of configuration files (`cadence.toml`, `cadence.<env>.toml`)
pub const CONFIG_FILE_STEM: &str = "cadence";

/// Prefix of environment variable overrides, e.g. `CADENCE_BATCHING__MAX_READ_COUNT`
pub const ENV_PREFIX: &str = "CADENCE";

/// Lifecycle event names published by the task pipeline
pub mod events {
    pub const PHASE_ENTERED: &str = "sequencer.phase_entered";
    pub const BUNDLE_EMITTED: &str = "sequencer.bundle_emitted";
    pub const WORK_ITEMS_UNSATISFIABLE: &str = "batch.work_items_unsatisfiable";
    pub const SEQUENCE_COMPLETED: &str = "sequencer.sequence_completed";
}

//! # Batching
//!
//! Bounded-resource batch planning over an ordered list of work items. The
//! [`BatchPlanner`] decides which items form the next batch and drives a read-through
//! [`BoundedCache`] until every item of that batch is populated or known to be
//! unsatisfiable.

pub mod cache;
pub mod errors;
pub mod planner;

pub use cache::{BoundedCache, CacheLookup, CacheStats, RefillOutcome};
pub use errors::{BatchError, BatchResult};
pub use planner::{max_time_series_count, select_batch, Batch, BatchPlanner, UnsatisfiableItem};

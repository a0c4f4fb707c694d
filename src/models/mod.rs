//! # Data Model
//!
//! Shapes the batching core operates over: series identifiers, cadence ranges, stored
//! series, and the work items that need them.

pub mod cadence;
pub mod identifier;
pub mod series;
pub mod target;
pub mod work_item;

pub use cadence::{CadenceRange, InvalidCadenceRange};
pub use identifier::{ProducerId, TimeSeriesId};
pub use series::Series;
pub use target::Target;
pub use work_item::{SeriesMap, WorkItem};

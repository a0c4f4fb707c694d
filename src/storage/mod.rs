//! # Storage Boundary
//!
//! The batching core reads time series through [`TimeSeriesReader`]; the storage service
//! itself lives outside this crate.

pub mod errors;
pub mod memory;
pub mod reader;

pub use errors::{StorageError, StorageResult};
pub use memory::InMemoryTimeSeriesStore;
pub use reader::TimeSeriesReader;

//! # Lineage
//!
//! Tracks which upstream producers contributed the series read for each bundle, and hands
//! that provenance to a [`ProvenanceSink`] for the accountability trail.

pub mod sink;
pub mod tracker;

pub use sink::{
    InMemoryProvenanceSink, ProvenanceError, ProvenanceRecord, ProvenanceResult, ProvenanceScope,
    ProvenanceSink,
};
pub use tracker::{LineageTracker, SharedLineageTracker};

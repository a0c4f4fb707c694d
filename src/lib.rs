#![allow(clippy::doc_markdown)] // Allow technical terms like PPA, FFI in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Cadence Core
//!
//! Batching and orchestration core for a time-series processing pipeline.
//!
//! ## Overview
//!
//! A processing task can need millions of individually addressed time series, far more
//! than fit in memory or in one storage read. This crate turns a task's ordered work items
//! into bounded batches, pulls their series through a read-through cache in bounded
//! reads, and walks an ordered table of phases one sub-task bundle at a time, tracking
//! which upstream producers every bundle depended on.
//!
//! ## Architecture
//!
//! ```text
//! TaskPipeline ─▶ PhaseSequencer ─▶ BatchPhase ─▶ BatchPlanner ─▶ BoundedCache ─▶ TimeSeriesReader
//!       │                │                              │
//!       ▼                ▼                              ▼
//! SubTaskDispatcher  InputBundle ◀──── lineage ──── LineageTracker ─▶ ProvenanceSink
//! ```
//!
//! ## Module Organization
//!
//! - [`models`] - Identifiers, cadence ranges, series, and work items
//! - [`storage`] - Time-series reader boundary and an in-memory store
//! - [`batching`] - Bounded cache and batch planner
//! - [`lineage`] - Producer lineage tracking and provenance sinks
//! - [`state_machine`] - Phases, phase plans, and the bundle sequencer
//! - [`orchestration`] - Task pipelines, dispatch, and result assembly
//! - [`events`] - Lifecycle event publishing
//! - [`config`] - Configuration management
//! - [`error`] - Crate-wide error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cadence_core::config::BatchingConfig;
//! use cadence_core::models::{CadenceRange, Target, TimeSeriesId};
//! use cadence_core::state_machine::{Phase, PhaseContext, PhasePlan, PhaseSequencer};
//! use cadence_core::storage::InMemoryTimeSeriesStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let range = CadenceRange::new(0, 4319)?;
//! let store = Arc::new(InMemoryTimeSeriesStore::new());
//! let targets = vec![Target::new(1, [TimeSeriesId::new("/pixel/1/0")])];
//!
//! let plan = PhasePlan::new().required_batch(Phase::Targets, targets);
//! let context = PhaseContext::new(BatchingConfig::default(), range, store);
//! let mut sequencer = PhaseSequencer::new(plan, context)?;
//!
//! while sequencer.has_next() {
//!     let bundle = sequencer.next_bundle().await?;
//!     println!("bundle {} ({}) last={}", bundle.index, bundle.phase, bundle.last_call);
//! }
//! # Ok(())
//! # }
//! ```

pub mod batching;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod lineage;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod state_machine;
pub mod storage;

pub use batching::{Batch, BatchError, BatchPlanner, BoundedCache, CacheStats};
pub use config::{BatchingConfig, CadenceConfig, ConfigManager, ConfigurationError};
pub use error::{CadenceError, Result};
pub use events::EventPublisher;
pub use lineage::{LineageTracker, ProvenanceSink, SharedLineageTracker};
pub use models::{CadenceRange, ProducerId, Series, Target, TimeSeriesId, WorkItem};
pub use orchestration::{run_pipelines_concurrently, SubTaskDispatcher, TaskOutcome, TaskPipeline};
pub use state_machine::{InputBundle, Phase, PhasePlan, PhaseSequencer, SequencerError};
pub use storage::{StorageError, TimeSeriesReader};

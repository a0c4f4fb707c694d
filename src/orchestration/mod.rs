//! # Orchestration
//!
//! Drives a task's phase sequence end to end: bundles are pulled from the
//! [`PhaseSequencer`](crate::state_machine::PhaseSequencer), dispatched to the external
//! engine through a [`SubTaskDispatcher`] with bounded concurrency, and their results are
//! reassembled in sequence order by the [`ResultAssembler`].
//!
//! ## Core Components
//!
//! - **TaskPipeline**: one task from first bundle to cumulative provenance
//! - **SubTaskDispatcher**: boundary to the computation engine
//! - **ResultAssembler**: out-of-order results back into bundle order, grouped by phase
//! - **run_pipelines_concurrently**: independent tasks in parallel, no shared state

pub mod dispatcher;
pub mod errors;
pub mod result_assembler;
pub mod task_pipeline;

pub use dispatcher::{SubTaskDispatcher, SubTaskResult};
pub use errors::{
    AssemblyError, DispatchError, DispatchResult, OrchestrationError, OrchestrationResult,
};
pub use result_assembler::{AssembledResults, PhaseResults, ResultAssembler};
pub use task_pipeline::{run_pipelines_concurrently, TaskOutcome, TaskPipeline};

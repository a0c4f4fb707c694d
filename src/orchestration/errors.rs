use crate::lineage::ProvenanceError;
use crate::state_machine::{Phase, SequencerError};
use thiserror::Error;

/// Failure reported by a sub-task dispatcher
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The engine refused the bundle; resubmitting it unchanged will fail again
    #[error("Bundle {bundle_index} rejected: {message}")]
    Rejected { bundle_index: usize, message: String },

    #[error("Bundle {bundle_index} failed during execution: {message}")]
    Failed { bundle_index: usize, message: String },

    #[error("Dispatcher unavailable: {message}")]
    Unavailable { message: String },
}

impl DispatchError {
    pub fn rejected(bundle_index: usize, message: impl Into<String>) -> Self {
        Self::Rejected {
            bundle_index,
            message: message.into(),
        }
    }

    pub fn failed(bundle_index: usize, message: impl Into<String>) -> Self {
        Self::Failed {
            bundle_index,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Failed { .. })
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// A sub-task result that does not fit the bundles awaiting one
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Result for unknown bundle {bundle_index}")]
    UnknownBundle { bundle_index: usize },

    #[error("Result for bundle {bundle_index} tagged {actual} but bundle was {expected}")]
    PhaseMismatch {
        bundle_index: usize,
        expected: Phase,
        actual: Phase,
    },

    #[error("Duplicate result for bundle {bundle_index}")]
    DuplicateResult { bundle_index: usize },

    #[error("Missing results for bundles {pending:?}")]
    MissingResults { pending: Vec<usize> },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestrationError {
    #[error("Task {task_id}: {source}")]
    Sequencer {
        task_id: i64,
        #[source]
        source: SequencerError,
    },

    #[error("Task {task_id}: {source}")]
    Dispatch {
        task_id: i64,
        #[source]
        source: DispatchError,
    },

    #[error("Task {task_id}: {source}")]
    Provenance {
        task_id: i64,
        #[source]
        source: ProvenanceError,
    },

    #[error("Task {task_id}: result assembly failed: {source}")]
    Assembly {
        task_id: i64,
        #[source]
        source: AssemblyError,
    },

    #[error("Task {task_id}: pipeline aborted: {message}")]
    Aborted { task_id: i64, message: String },
}

impl OrchestrationError {
    pub fn sequencer(task_id: i64, source: SequencerError) -> Self {
        Self::Sequencer { task_id, source }
    }

    pub fn dispatch(task_id: i64, source: DispatchError) -> Self {
        Self::Dispatch { task_id, source }
    }

    pub fn provenance(task_id: i64, source: ProvenanceError) -> Self {
        Self::Provenance { task_id, source }
    }

    pub fn assembly(task_id: i64, source: AssemblyError) -> Self {
        Self::Assembly { task_id, source }
    }

    pub fn aborted(task_id: i64, message: impl Into<String>) -> Self {
        Self::Aborted {
            task_id,
            message: message.into(),
        }
    }

    pub fn task_id(&self) -> i64 {
        match self {
            Self::Sequencer { task_id, .. }
            | Self::Dispatch { task_id, .. }
            | Self::Provenance { task_id, .. }
            | Self::Assembly { task_id, .. }
            | Self::Aborted { task_id, .. } => *task_id,
        }
    }
}

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

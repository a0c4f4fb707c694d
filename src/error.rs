use crate::batching::BatchError;
use crate::config::ConfigurationError;
use crate::lineage::ProvenanceError;
use crate::models::InvalidCadenceRange;
use crate::orchestration::{DispatchError, OrchestrationError};
use crate::state_machine::SequencerError;
use crate::storage::StorageError;
use thiserror::Error;

/// Any error the crate can return
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CadenceError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    CadenceRange(#[from] InvalidCadenceRange),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    #[error("Provenance error: {0}")]
    Provenance(#[from] ProvenanceError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),
}

impl CadenceError {
    /// Repeating the failed operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_retryable(),
            Self::Batch(e) => e.is_retryable(),
            Self::Sequencer(e) => e.is_retryable(),
            Self::Dispatch(e) => e.is_retryable(),
            Self::Orchestration(OrchestrationError::Sequencer { source, .. }) => {
                source.is_retryable()
            }
            Self::Orchestration(OrchestrationError::Dispatch { source, .. }) => {
                source.is_retryable()
            }
            _ => false,
        }
    }

    /// The caller misused an API rather than hitting a runtime failure
    pub fn is_contract_violation(&self) -> bool {
        match self {
            Self::Sequencer(e) => e.is_contract_violation(),
            Self::Orchestration(OrchestrationError::Sequencer { source, .. }) => {
                source.is_contract_violation()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CadenceError>;

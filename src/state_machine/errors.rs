use super::phases::Phase;
use crate::batching::BatchError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequencerError {
    #[error("Invalid phase plan: {message}")]
    Configuration { message: String },

    /// The caller asked for another bundle after the last one was emitted
    #[error("Sequence already complete after {bundles_emitted} bundles")]
    AlreadyComplete { bundles_emitted: usize },

    #[error("Phase plan produces no bundles")]
    EmptySequence,

    #[error("Batch phase failed: {0}")]
    Batch(#[from] BatchError),

    #[error("Side phase {phase} failed: {message}")]
    SideDataFailed { phase: Phase, message: String },

    #[error("Invalid checkpoint: {message}")]
    InvalidCheckpoint { message: String },
}

impl SequencerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn side_data_failed(phase: Phase, message: impl Into<String>) -> Self {
        Self::SideDataFailed {
            phase,
            message: message.into(),
        }
    }

    pub fn invalid_checkpoint(message: impl Into<String>) -> Self {
        Self::InvalidCheckpoint {
            message: message.into(),
        }
    }

    /// The caller broke the sequencing contract; retrying will not help
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::AlreadyComplete { .. })
    }

    /// Repeating the same call may succeed without rebuilding the sequencer
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Batch(e) => e.is_retryable(),
            Self::SideDataFailed { .. } => true,
            _ => false,
        }
    }
}

pub type SequencerResult<T> = Result<T, SequencerError>;

use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    #[error("Invalid batch configuration: {message}")]
    Configuration { message: String },

    #[error("Storage read failed while planning batch: {0}")]
    Storage(#[from] StorageError),

    /// Every item of the batch starting at `start_index` requires a series the store does
    /// not have. The planner has already moved past this batch.
    #[error("All {count} work items of batch at index {start_index} are unsatisfiable: {item_keys:?}")]
    AllUnsatisfiable {
        start_index: usize,
        count: usize,
        item_keys: Vec<String>,
    },

    #[error("No batches remain: cursor {cursor} of {total} work items")]
    Exhausted { cursor: usize, total: usize },

    #[error("Cannot seek to position {position}: only {total} work items")]
    InvalidPosition { position: usize, total: usize },
}

impl BatchError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn all_unsatisfiable(start_index: usize, item_keys: Vec<String>) -> Self {
        Self::AllUnsatisfiable {
            start_index,
            count: item_keys.len(),
            item_keys,
        }
    }

    pub fn exhausted(cursor: usize, total: usize) -> Self {
        Self::Exhausted { cursor, total }
    }

    pub fn invalid_position(position: usize, total: usize) -> Self {
        Self::InvalidPosition { position, total }
    }

    /// A retry of the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_retryable())
    }

    /// The planner moved past the failed batch and the caller may keep going
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::AllUnsatisfiable { .. })
    }
}

pub type BatchResult<T> = Result<T, BatchError>;

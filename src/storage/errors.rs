//! # Storage Error Types
//!
//! Failures reported by the time-series storage collaborator. Read failures carry the
//! request context (identifier count, first identifier, cadence range) and are safe to
//! retry at the same cursor position.

use crate::models::{CadenceRange, TimeSeriesId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Time series read failed for {id_count} ids starting at {first_id} over {range}: {message}")]
    ReadFailed {
        id_count: usize,
        first_id: String,
        range: CadenceRange,
        message: String,
    },

    #[error("Series {id} covers {actual} but {expected} was requested")]
    RangeMismatch {
        id: TimeSeriesId,
        expected: CadenceRange,
        actual: CadenceRange,
    },

    #[error("Store returned series {id} which was not requested")]
    UnexpectedSeries { id: TimeSeriesId },

    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },
}

impl StorageError {
    /// Create a read failure with request context
    pub fn read_failed(
        ids: &std::collections::BTreeSet<TimeSeriesId>,
        range: CadenceRange,
        message: impl Into<String>,
    ) -> Self {
        Self::ReadFailed {
            id_count: ids.len(),
            first_id: ids
                .iter()
                .next()
                .map(ToString::to_string)
                .unwrap_or_else(|| "<none>".to_string()),
            range,
            message: message.into(),
        }
    }

    pub fn range_mismatch(id: TimeSeriesId, expected: CadenceRange, actual: CadenceRange) -> Self {
        Self::RangeMismatch {
            id,
            expected,
            actual,
        }
    }

    pub fn unexpected_series(id: TimeSeriesId) -> Self {
        Self::UnexpectedSeries { id }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Whether re-issuing the same read may succeed. Protocol violations by the store
    /// are not retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ReadFailed { .. } | Self::Unavailable { .. })
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

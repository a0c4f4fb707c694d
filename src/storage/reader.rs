use super::errors::StorageResult;
use crate::models::{CadenceRange, Series, TimeSeriesId};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Boundary to the time-series storage service.
///
/// A read returns one entry per requested identifier covering exactly `range`; entries
/// the store does not hold come back with `exists() == false`.
#[async_trait]
pub trait TimeSeriesReader: Send + Sync {
    async fn read(
        &self,
        ids: &BTreeSet<TimeSeriesId>,
        range: CadenceRange,
    ) -> StorageResult<Vec<Series>>;

    /// Name of this reader for logging
    fn description(&self) -> &'static str {
        "time_series_reader"
    }
}

#[async_trait]
impl<R: TimeSeriesReader + ?Sized> TimeSeriesReader for Arc<R> {
    async fn read(
        &self,
        ids: &BTreeSet<TimeSeriesId>,
        range: CadenceRange,
    ) -> StorageResult<Vec<Series>> {
        (**self).read(ids, range).await
    }

    fn description(&self) -> &'static str {
        (**self).description()
    }
}

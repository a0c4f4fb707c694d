//! # In-Memory Time Series Store
//!
//! Dashmap-backed [`TimeSeriesReader`] used by tests, benches and local runs. Records
//! every read request in order and can be told to fail upcoming reads, which is how the
//! retry behaviour of the planner is exercised.

use super::errors::{StorageError, StorageResult};
use super::reader::TimeSeriesReader;
use crate::models::{CadenceRange, ProducerId, Series, TimeSeriesId};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredSeries {
    first_cadence: i32,
    values: Vec<f32>,
    gaps: Vec<bool>,
    originators: BTreeSet<ProducerId>,
}

impl StoredSeries {
    fn slice(&self, id: &TimeSeriesId, range: CadenceRange) -> StorageResult<Series> {
        let mut values = Vec::with_capacity(range.len());
        let mut gaps = Vec::with_capacity(range.len());
        for cadence in range.start()..=range.end() {
            let offset = i64::from(cadence) - i64::from(self.first_cadence);
            match usize::try_from(offset).ok().filter(|o| *o < self.values.len()) {
                Some(o) => {
                    values.push(self.values[o]);
                    gaps.push(self.gaps[o]);
                }
                None => {
                    values.push(0.0);
                    gaps.push(true);
                }
            }
        }
        Series::new(id.clone(), range, values, gaps, self.originators.clone())
            .map_err(StorageError::unavailable)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTimeSeriesStore {
    series: DashMap<TimeSeriesId, StoredSeries>,
    read_log: Mutex<Vec<Vec<TimeSeriesId>>>,
    pending_failures: AtomicUsize,
}

impl InMemoryTimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an ungapped series starting at `first_cadence`
    pub fn insert(
        &self,
        id: TimeSeriesId,
        first_cadence: i32,
        values: Vec<f32>,
        producer: ProducerId,
    ) {
        let gaps = vec![false; values.len()];
        self.series.insert(
            id,
            StoredSeries {
                first_cadence,
                values,
                gaps,
                originators: BTreeSet::from([producer]),
            },
        );
    }

    /// Store a constant series over `range`
    pub fn insert_constant(
        &self,
        id: TimeSeriesId,
        range: CadenceRange,
        value: f32,
        producer: ProducerId,
    ) {
        self.insert(id, range.start(), vec![value; range.len()], producer);
    }

    /// Make the next `count` reads fail without touching any data
    pub fn fail_next_reads(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Identifiers of every read request received, failed ones included
    pub fn read_log(&self) -> Vec<Vec<TimeSeriesId>> {
        self.read_log.lock().clone()
    }

    pub fn read_count(&self) -> usize {
        self.read_log.lock().len()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    fn take_failure(&self) -> bool {
        self.pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl TimeSeriesReader for InMemoryTimeSeriesStore {
    async fn read(
        &self,
        ids: &BTreeSet<TimeSeriesId>,
        range: CadenceRange,
    ) -> StorageResult<Vec<Series>> {
        self.read_log.lock().push(ids.iter().cloned().collect());

        if self.take_failure() {
            return Err(StorageError::read_failed(ids, range, "injected read failure"));
        }

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let series = match self.series.get(id) {
                Some(stored) => stored.slice(id, range)?,
                None => Series::absent(id.clone(), range),
            };
            results.push(series);
        }

        debug!(
            requested = ids.len(),
            present = results.iter().filter(|s| s.exists()).count(),
            range = %range,
            "In-memory store served read"
        );

        Ok(results)
    }

    fn description(&self) -> &'static str {
        "in_memory_time_series_store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> BTreeSet<TimeSeriesId> {
        names.iter().map(|n| TimeSeriesId::new(n)).collect()
    }

    #[tokio::test]
    async fn test_read_marks_missing_series_absent() {
        let store = InMemoryTimeSeriesStore::new();
        let range = CadenceRange::new(0, 2).unwrap();
        store.insert_constant(TimeSeriesId::new("/a"), range, 1.5, ProducerId(3));

        let series = store.read(&ids(&["/a", "/b"]), range).await.unwrap();
        assert_eq!(series.len(), 2);
        assert!(series[0].exists());
        assert_eq!(series[0].values(), &[1.5, 1.5, 1.5]);
        assert!(!series[1].exists());
        assert!(series[1].is_fully_gapped());
    }

    #[tokio::test]
    async fn test_cadences_outside_stored_span_are_gapped() {
        let store = InMemoryTimeSeriesStore::new();
        store.insert(TimeSeriesId::new("/a"), 10, vec![1.0, 2.0], ProducerId(1));

        let range = CadenceRange::new(9, 12).unwrap();
        let series = store.read(&ids(&["/a"]), range).await.unwrap();
        assert_eq!(series[0].gaps(), &[true, false, false, true]);
        assert_eq!(series[0].values(), &[0.0, 1.0, 2.0, 0.0]);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = InMemoryTimeSeriesStore::new();
        let range = CadenceRange::new(0, 0).unwrap();
        store.fail_next_reads(1);

        assert!(store.read(&ids(&["/a"]), range).await.is_err());
        assert!(store.read(&ids(&["/a"]), range).await.is_ok());
        assert_eq!(store.read_count(), 2);
    }
}

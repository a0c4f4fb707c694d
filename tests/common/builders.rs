//! Test data builders shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use cadence_core::config::BatchingConfig;
use cadence_core::lineage::{
    InMemoryProvenanceSink, ProvenanceError, ProvenanceRecord, ProvenanceResult, ProvenanceScope,
    ProvenanceSink,
};
use cadence_core::models::{CadenceRange, ProducerId, Target, TimeSeriesId, WorkItem};
use cadence_core::orchestration::{DispatchError, DispatchResult, SubTaskDispatcher, SubTaskResult};
use cadence_core::state_machine::{InputBundle, PhaseContext};
use cadence_core::storage::InMemoryTimeSeriesStore;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub fn cadence_range() -> CadenceRange {
    CadenceRange::new(0, 9).unwrap()
}

pub fn pixel_id(target: i64, pixel: usize) -> TimeSeriesId {
    TimeSeriesId::new(format!("/target/{target}/pixel/{pixel}"))
}

/// Targets with ids starting at `first_id`, each needing `pixels` series of its own
pub fn targets_with_pixels(first_id: i64, count: usize, pixels: usize) -> Vec<Target> {
    (0..count as i64)
        .map(|offset| {
            let id = first_id + offset;
            Target::new(id, (0..pixels).map(|p| pixel_id(id, p)))
        })
        .collect()
}

/// Targets whose series counts follow `sizes`
pub fn targets_from_sizes(sizes: &[usize]) -> Vec<Target> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, &pixels)| {
            let id = i as i64;
            Target::new(id, (0..pixels).map(|p| pixel_id(id, p)))
        })
        .collect()
}

/// Builder for an in-memory store pre-loaded with constant series
pub struct StoreBuilder {
    range: CadenceRange,
    store: InMemoryTimeSeriesStore,
}

impl StoreBuilder {
    pub fn new(range: CadenceRange) -> Self {
        Self {
            range,
            store: InMemoryTimeSeriesStore::new(),
        }
    }

    pub fn with_series(self, id: TimeSeriesId, producer: i64) -> Self {
        self.store
            .insert_constant(id, self.range, 1.0, ProducerId(producer));
        self
    }

    /// Store every series `items` need, each attributed to its target as producer
    pub fn with_targets(self, items: &[Target]) -> Self {
        for target in items {
            for id in target.required_identifiers() {
                self.store.insert_constant(
                    id.clone(),
                    self.range,
                    target.target_id as f32,
                    ProducerId(target.target_id),
                );
            }
        }
        self
    }

    pub fn failing_next_reads(self, count: usize) -> Self {
        self.store.fail_next_reads(count);
        self
    }

    pub fn build(self) -> Arc<InMemoryTimeSeriesStore> {
        Arc::new(self.store)
    }
}

pub fn phase_context(store: Arc<InMemoryTimeSeriesStore>, batching: BatchingConfig) -> PhaseContext {
    PhaseContext::new(batching, cadence_range(), store)
}

pub fn producers(ids: &[i64]) -> BTreeSet<ProducerId> {
    ids.iter().copied().map(ProducerId).collect()
}

/// Dispatcher that records every bundle it receives and answers with the item count.
///
/// Earlier bundles can be made to finish later than later ones, and a chosen bundle can
/// be made to fail.
#[derive(Default)]
pub struct RecordingDispatcher {
    dispatched: Mutex<Vec<usize>>,
    item_keys: Mutex<Vec<String>>,
    reverse_completion: bool,
    fail_bundle: Option<usize>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completing_in_reverse(mut self) -> Self {
        self.reverse_completion = true;
        self
    }

    pub fn failing_on(mut self, bundle_index: usize) -> Self {
        self.fail_bundle = Some(bundle_index);
        self
    }

    pub fn dispatched(&self) -> Vec<usize> {
        self.dispatched.lock().clone()
    }

    pub fn item_keys(&self) -> Vec<String> {
        self.item_keys.lock().clone()
    }
}

#[async_trait]
impl<W: WorkItem> SubTaskDispatcher<W> for RecordingDispatcher {
    async fn dispatch(&self, task_id: i64, bundle: InputBundle<W>) -> DispatchResult<SubTaskResult> {
        self.dispatched.lock().push(bundle.index);
        self.item_keys
            .lock()
            .extend(bundle.items().iter().map(WorkItem::item_key));

        if self.reverse_completion {
            let delay = 20u64.saturating_sub(bundle.index as u64 * 5);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_bundle == Some(bundle.index) {
            return Err(DispatchError::failed(bundle.index, "engine crashed"));
        }

        Ok(SubTaskResult::new(
            task_id,
            bundle.index,
            bundle.phase,
            json!({ "items": bundle.items().len(), "last_call": bundle.last_call }),
        ))
    }

    fn description(&self) -> &'static str {
        "recording_dispatcher"
    }
}

/// Provenance sink that refuses records of one scope and keeps the rest
pub struct FailingProvenanceSink {
    inner: InMemoryProvenanceSink,
    failing_scope: ProvenanceScope,
}

impl FailingProvenanceSink {
    pub fn failing_on(failing_scope: ProvenanceScope) -> Self {
        Self {
            inner: InMemoryProvenanceSink::new(),
            failing_scope,
        }
    }

    pub fn records(&self) -> Vec<ProvenanceRecord> {
        self.inner.records()
    }
}

#[async_trait]
impl ProvenanceSink for FailingProvenanceSink {
    async fn persist(&self, record: ProvenanceRecord) -> ProvenanceResult<()> {
        if record.scope == self.failing_scope {
            return Err(ProvenanceError::persist_failed(record.task_id, "lineage store offline"));
        }
        self.inner.persist(record).await
    }
}

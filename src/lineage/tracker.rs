use crate::models::ProducerId;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Provenance accumulator for one task.
///
/// Producer ids recorded while satisfying reads stay pending until [`drain`] hands them
/// to the bundle being emitted. Drained ids are also folded into a cumulative set that is
/// never cleared, which backs the end-of-task accountability record.
///
/// [`drain`]: LineageTracker::drain
#[derive(Debug, Default, Clone)]
pub struct LineageTracker {
    pending: BTreeSet<ProducerId>,
    cumulative: BTreeSet<ProducerId>,
}

impl LineageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, ids: impl IntoIterator<Item = ProducerId>) {
        self.pending.extend(ids);
    }

    /// Take everything recorded since the previous drain
    pub fn drain(&mut self) -> BTreeSet<ProducerId> {
        let drained = std::mem::take(&mut self.pending);
        self.cumulative.extend(drained.iter().copied());
        drained
    }

    /// Drop lineage of a cycle that will never be emitted
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    pub fn pending(&self) -> &BTreeSet<ProducerId> {
        &self.pending
    }

    pub fn cumulative(&self) -> &BTreeSet<ProducerId> {
        &self.cumulative
    }
}

/// Synchronized handle to a [`LineageTracker`], shared between the planner that records
/// and the pipeline that drains.
#[derive(Debug, Default, Clone)]
pub struct SharedLineageTracker {
    inner: Arc<Mutex<LineageTracker>>,
}

impl SharedLineageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, ids: impl IntoIterator<Item = ProducerId>) {
        self.inner.lock().record(ids);
    }

    pub fn drain(&self) -> BTreeSet<ProducerId> {
        self.inner.lock().drain()
    }

    pub fn discard_pending(&self) {
        self.inner.lock().discard_pending();
    }

    pub fn pending(&self) -> BTreeSet<ProducerId> {
        self.inner.lock().pending().clone()
    }

    pub fn cumulative(&self) -> BTreeSet<ProducerId> {
        self.inner.lock().cumulative().clone()
    }
}

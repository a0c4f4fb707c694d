use super::generator::BundlePayload;
use super::phases::Phase;
use crate::batching::UnsatisfiableItem;
use crate::models::{ProducerId, WorkItem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One sub-task input produced by a call to the sequencer
#[derive(Debug, Clone)]
pub struct InputBundle<W> {
    /// Zero-based position in the sequence
    pub index: usize,
    pub phase: Phase,
    pub payload: BundlePayload<W>,
    pub first_call: bool,
    pub last_call: bool,
    /// Producers drained from the lineage tracker for this bundle
    pub lineage: BTreeSet<ProducerId>,
    /// Keys of items from batches skipped since the previous bundle because none of
    /// their items could be satisfied
    pub skipped_items: Vec<String>,
}

impl<W: WorkItem> InputBundle<W> {
    pub fn items(&self) -> &[W] {
        match &self.payload {
            BundlePayload::Batch(batch) => &batch.items,
            _ => &[],
        }
    }

    pub fn unsatisfiable(&self) -> &[UnsatisfiableItem] {
        match &self.payload {
            BundlePayload::Batch(batch) => &batch.unsatisfiable,
            _ => &[],
        }
    }

    pub fn side_data(&self) -> Option<&serde_json::Value> {
        match &self.payload {
            BundlePayload::SideData(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self.payload, BundlePayload::Batch(_))
    }

    /// Keys of every item this bundle reports as unsatisfiable, skipped batches included
    pub fn unsatisfiable_keys(&self) -> Vec<String> {
        self.skipped_items
            .iter()
            .cloned()
            .chain(self.unsatisfiable().iter().map(|u| u.item_key.clone()))
            .collect()
    }
}

/// Inclusive run `[first_index, last_index]` of consecutive bundles sharing a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseGroup {
    pub phase: Phase,
    pub first_index: usize,
    pub last_index: usize,
}

impl PhaseGroup {
    pub fn len(&self) -> usize {
        self.last_index - self.first_index + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.first_index..=self.last_index).contains(&index)
    }
}

/// Collapse `(bundle_index, phase)` pairs into contiguous same-phase groups.
///
/// A new group starts whenever the phase changes or an index is not the successor of the
/// previous one.
pub fn group_by_phase<I>(bundles: I) -> Vec<PhaseGroup>
where
    I: IntoIterator<Item = (usize, Phase)>,
{
    let mut groups: Vec<PhaseGroup> = Vec::new();
    for (index, phase) in bundles {
        match groups.last_mut() {
            Some(group) if group.phase == phase && group.last_index + 1 == index => {
                group.last_index = index;
            }
            _ => groups.push(PhaseGroup {
                phase,
                first_index: index,
                last_index: index,
            }),
        }
    }
    groups
}

use super::phases::Phase;
use crate::constants::events;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle events raised while a sequence is driven to completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SequencerEvent {
    /// The first bundle of a phase was emitted
    PhaseEntered { task_id: i64, phase: Phase, bundle_index: usize },
    BundleEmitted {
        task_id: i64,
        phase: Phase,
        bundle_index: usize,
        item_count: usize,
        last_call: bool,
    },
    /// Items dropped because the store lacks series they need
    WorkItemsUnsatisfiable {
        task_id: i64,
        phase: Phase,
        bundle_index: usize,
        item_keys: Vec<String>,
    },
    SequenceCompleted { task_id: i64, bundle_count: usize },
}

impl SequencerEvent {
    /// Get the published event name
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::PhaseEntered { .. } => events::PHASE_ENTERED,
            Self::BundleEmitted { .. } => events::BUNDLE_EMITTED,
            Self::WorkItemsUnsatisfiable { .. } => events::WORK_ITEMS_UNSATISFIABLE,
            Self::SequenceCompleted { .. } => events::SEQUENCE_COMPLETED,
        }
    }

    pub fn task_id(&self) -> i64 {
        match self {
            Self::PhaseEntered { task_id, .. }
            | Self::BundleEmitted { task_id, .. }
            | Self::WorkItemsUnsatisfiable { task_id, .. }
            | Self::SequenceCompleted { task_id, .. } => *task_id,
        }
    }

    /// Event body as published on the event channel
    pub fn context(&self) -> Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("data").map(Value::take))
            .unwrap_or(Value::Null)
    }
}

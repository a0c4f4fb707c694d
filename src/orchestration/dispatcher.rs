use super::errors::DispatchResult;
use crate::models::WorkItem;
use crate::state_machine::{InputBundle, Phase};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output of one dispatched bundle, keyed by its position in the sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTaskResult {
    pub task_id: i64,
    pub bundle_index: usize,
    pub phase: Phase,
    pub output: Value,
}

impl SubTaskResult {
    pub fn new(task_id: i64, bundle_index: usize, phase: Phase, output: Value) -> Self {
        Self {
            task_id,
            bundle_index,
            phase,
            output,
        }
    }
}

/// Boundary to the external computation engine.
///
/// Each bundle is dispatched once; results may complete in any order.
#[async_trait]
pub trait SubTaskDispatcher<W: WorkItem>: Send + Sync {
    async fn dispatch(&self, task_id: i64, bundle: InputBundle<W>) -> DispatchResult<SubTaskResult>;

    /// Get a description of this dispatcher for logging
    fn description(&self) -> &'static str {
        "sub_task_dispatcher"
    }
}

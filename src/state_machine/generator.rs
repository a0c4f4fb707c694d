use super::errors::{SequencerError, SequencerResult};
use super::phases::Phase;
use crate::batching::{Batch, BatchPlanner};
use crate::models::WorkItem;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Content of one bundle
#[derive(Debug, Clone)]
pub enum BundlePayload<W> {
    /// Populated work items of one planned batch
    Batch(Batch<W>),
    /// Phase-specific data that does not come from work items
    SideData(Value),
    /// Terminal bundle closing a sequence whose trailing batches were all unsatisfiable
    Empty,
}

impl<W> BundlePayload<W> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Batch(_) => "batch",
            Self::SideData(_) => "side_data",
            Self::Empty => "empty",
        }
    }
}

/// Produces the bundles of one phase, one per call.
#[async_trait]
pub trait PhaseGenerator<W: WorkItem>: Send + Sync {
    /// Whether another bundle can be produced. Must not have side effects.
    fn has_next(&self) -> bool;

    async fn produce(&mut self) -> SequencerResult<BundlePayload<W>>;

    fn reset(&mut self);

    /// Opaque progress marker accepted by [`seek`](PhaseGenerator::seek)
    fn position(&self) -> usize;

    fn seek(&mut self, position: usize) -> SequencerResult<()>;

    /// Get a description of this generator for logging
    fn description(&self) -> &'static str;
}

/// Batch phase backed by a [`BatchPlanner`]
pub struct BatchPhase<W: WorkItem> {
    planner: BatchPlanner<W>,
}

impl<W: WorkItem> BatchPhase<W> {
    pub fn new(planner: BatchPlanner<W>) -> Self {
        Self { planner }
    }

    pub fn planner(&self) -> &BatchPlanner<W> {
        &self.planner
    }
}

#[async_trait]
impl<W: WorkItem> PhaseGenerator<W> for BatchPhase<W> {
    fn has_next(&self) -> bool {
        self.planner.has_next()
    }

    async fn produce(&mut self) -> SequencerResult<BundlePayload<W>> {
        let batch = self.planner.next_batch().await?;
        Ok(BundlePayload::Batch(batch))
    }

    fn reset(&mut self) {
        self.planner.reset();
    }

    fn position(&self) -> usize {
        self.planner.position()
    }

    fn seek(&mut self, position: usize) -> SequencerResult<()> {
        self.planner.seek(position).map_err(SequencerError::from)
    }

    fn description(&self) -> &'static str {
        "batch_phase"
    }
}

/// Closure computing a side phase's data
pub type SideDataFn = Arc<dyn Fn() -> Result<Value, String> + Send + Sync>;

/// Phase that emits exactly one side-data bundle
pub struct SidePhase {
    phase: Phase,
    producer: SideDataFn,
    emitted: bool,
}

impl SidePhase {
    pub fn new(phase: Phase, producer: SideDataFn) -> Self {
        Self {
            phase,
            producer,
            emitted: false,
        }
    }
}

#[async_trait]
impl<W: WorkItem> PhaseGenerator<W> for SidePhase {
    fn has_next(&self) -> bool {
        !self.emitted
    }

    async fn produce(&mut self) -> SequencerResult<BundlePayload<W>> {
        let data =
            (self.producer)().map_err(|e| SequencerError::side_data_failed(self.phase, e))?;
        self.emitted = true;
        Ok(BundlePayload::SideData(data))
    }

    fn reset(&mut self) {
        self.emitted = false;
    }

    fn position(&self) -> usize {
        usize::from(self.emitted)
    }

    fn seek(&mut self, position: usize) -> SequencerResult<()> {
        match position {
            0 => self.emitted = false,
            1 => self.emitted = true,
            other => {
                return Err(SequencerError::invalid_checkpoint(format!(
                    "side phase {} cannot seek to {other}",
                    self.phase
                )))
            }
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "side_phase"
    }
}

use super::bundle::InputBundle;
use super::errors::{SequencerError, SequencerResult};
use super::generator::{BatchPhase, BundlePayload, PhaseGenerator, SidePhase};
use super::phases::Phase;
use super::plan::{PhasePlan, PhaseSource};
use crate::batching::{BatchError, BatchPlanner};
use crate::config::BatchingConfig;
use crate::lineage::SharedLineageTracker;
use crate::models::{CadenceRange, WorkItem};
use crate::storage::TimeSeriesReader;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Everything a batch phase needs to build its planner
#[derive(Clone)]
pub struct PhaseContext {
    pub batching: BatchingConfig,
    pub range: CadenceRange,
    pub reader: Arc<dyn TimeSeriesReader>,
    pub lineage: SharedLineageTracker,
}

impl PhaseContext {
    pub fn new(
        batching: BatchingConfig,
        range: CadenceRange,
        reader: Arc<dyn TimeSeriesReader>,
    ) -> Self {
        Self {
            batching,
            range,
            reader,
            lineage: SharedLineageTracker::new(),
        }
    }
}

impl std::fmt::Debug for PhaseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseContext")
            .field("batching", &self.batching)
            .field("range", &self.range)
            .field("reader", &self.reader.description())
            .finish()
    }
}

/// Resumable position of a sequencer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerCheckpoint {
    pub phase_index: usize,
    pub phase: Phase,
    /// Progress of the current phase's generator
    pub position: usize,
    pub phase_emitted: Vec<usize>,
    pub bundles_emitted: usize,
    /// Skipped item keys not yet reported on a bundle
    #[serde(default)]
    pub skipped_items: Vec<String>,
    pub done: bool,
}

enum PhaseSlot<W: WorkItem> {
    /// Not yet needed; built on first use
    Pending(PhaseSource<W>),
    Ready(Box<dyn PhaseGenerator<W>>),
}

impl<W: WorkItem> PhaseSlot<W> {
    fn has_next(&self) -> bool {
        match self {
            Self::Pending(PhaseSource::Batch { items, .. }) => !items.is_empty(),
            Self::Pending(PhaseSource::Side { .. }) => true,
            Self::Ready(generator) => generator.has_next(),
        }
    }
}

/// Drives an ordered [`PhasePlan`] one bundle per call.
///
/// Phases run strictly in plan order. Empty batch phases are skipped, and a gated phase
/// runs only when its gate phase emitted something. The bundle after which no phase has
/// further output is flagged `last_call`, and any call after it is a contract violation.
pub struct PhaseSequencer<W: WorkItem> {
    phases: Vec<Phase>,
    gates: Vec<Option<usize>>,
    slots: Vec<PhaseSlot<W>>,
    context: PhaseContext,
    current: usize,
    phase_emitted: Vec<usize>,
    bundles_emitted: usize,
    /// Keys of skipped items not yet reported on a bundle
    skipped_items: Vec<String>,
    done: bool,
}

impl<W: WorkItem> std::fmt::Debug for PhaseSequencer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseSequencer")
            .field("phases", &self.phases)
            .field("current", &self.current)
            .field("bundles_emitted", &self.bundles_emitted)
            .field("done", &self.done)
            .finish()
    }
}

impl<W: WorkItem> PhaseSequencer<W> {
    pub fn new(plan: PhasePlan<W>, context: PhaseContext) -> SequencerResult<Self> {
        if plan.is_empty() {
            return Err(SequencerError::configuration("phase plan has no phases"));
        }
        plan.validate()?;
        context
            .batching
            .validate()
            .map_err(|e| SequencerError::configuration(e.to_string()))?;

        let specs = plan.into_specs();
        let phases: Vec<Phase> = specs.iter().map(|s| s.phase).collect();
        let gates = specs
            .iter()
            .map(|s| s.gate.and_then(|g| phases.iter().position(|p| *p == g)))
            .collect();
        let slots = specs
            .into_iter()
            .map(|s| PhaseSlot::Pending(s.source))
            .collect();

        debug!(phases = ?phases, range = %context.range, "Created phase sequencer");

        Ok(Self {
            phase_emitted: vec![0; phases.len()],
            phases,
            gates,
            slots,
            context,
            current: 0,
            bundles_emitted: 0,
            skipped_items: Vec::new(),
            done: false,
        })
    }

    /// Produce the next bundle.
    ///
    /// A batch whose items are all unsatisfiable is skipped and its item keys are carried on
    /// the next bundle. Storage and side-phase failures leave the sequencer where it was,
    /// so the same call can be retried.
    #[instrument(skip_all, fields(bundle_index = self.bundles_emitted))]
    pub async fn next_bundle(&mut self) -> SequencerResult<InputBundle<W>> {
        if self.done {
            return Err(SequencerError::AlreadyComplete {
                bundles_emitted: self.bundles_emitted,
            });
        }

        loop {
            if !self.has_output(self.current) {
                match self.next_phase_with_output(self.current + 1) {
                    Some(next) => {
                        debug!(
                            from = %self.phases[self.current],
                            to = %self.phases[next],
                            "Advancing to next phase"
                        );
                        self.current = next;
                        continue;
                    }
                    None if self.bundles_emitted == 0 && self.skipped_items.is_empty() => {
                        self.done = true;
                        return Err(SequencerError::EmptySequence);
                    }
                    None => return Ok(self.emit(BundlePayload::Empty)),
                }
            }

            let generator = self.ensure_generator(self.current)?;
            match generator.produce().await {
                Ok(payload) => return Ok(self.emit(payload)),
                Err(SequencerError::Batch(BatchError::AllUnsatisfiable {
                    start_index,
                    item_keys,
                    ..
                })) => {
                    warn!(
                        phase = %self.phases[self.current],
                        start_index = start_index,
                        skipped = item_keys.len(),
                        "Skipping batch with no satisfiable work items"
                    );
                    self.skipped_items.extend(item_keys);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Whether a further call will produce a bundle
    pub fn has_next(&self) -> bool {
        !self.done && self.any_output_from(self.current)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.phases.get(self.current).copied()
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn bundles_emitted(&self) -> usize {
        self.bundles_emitted
    }

    pub fn lineage(&self) -> &SharedLineageTracker {
        &self.context.lineage
    }

    /// Stop without finishing. Lineage recorded for the unfinished bundle is dropped.
    pub fn abandon(&mut self) {
        self.context.lineage.discard_pending();
        self.done = true;
        info!(
            bundles_emitted = self.bundles_emitted,
            "Sequence abandoned"
        );
    }

    /// Back to the first phase with every generator rewound
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            if let PhaseSlot::Ready(generator) = slot {
                generator.reset();
            }
        }
        self.context.lineage.discard_pending();
        self.current = 0;
        self.phase_emitted.iter_mut().for_each(|n| *n = 0);
        self.bundles_emitted = 0;
        self.skipped_items.clear();
        self.done = false;
    }

    pub fn checkpoint(&self) -> SequencerCheckpoint {
        let position = match &self.slots[self.current] {
            PhaseSlot::Ready(generator) => generator.position(),
            PhaseSlot::Pending(_) => 0,
        };
        SequencerCheckpoint {
            phase_index: self.current,
            phase: self.phases[self.current],
            position,
            phase_emitted: self.phase_emitted.clone(),
            bundles_emitted: self.bundles_emitted,
            skipped_items: self.skipped_items.clone(),
            done: self.done,
        }
    }

    /// Resume from `checkpoint`, which must come from a sequencer built from the same plan
    pub fn restore(&mut self, checkpoint: &SequencerCheckpoint) -> SequencerResult<()> {
        if checkpoint.phase_emitted.len() != self.phases.len()
            || self.phases.get(checkpoint.phase_index) != Some(&checkpoint.phase)
        {
            return Err(SequencerError::invalid_checkpoint(format!(
                "checkpoint at phase {} (index {}) does not match plan {:?}",
                checkpoint.phase, checkpoint.phase_index, self.phases
            )));
        }

        self.reset();
        self.current = checkpoint.phase_index;
        self.phase_emitted = checkpoint.phase_emitted.clone();
        self.bundles_emitted = checkpoint.bundles_emitted;
        self.skipped_items = checkpoint.skipped_items.clone();
        self.done = checkpoint.done;

        let generator = self.ensure_generator(self.current)?;
        generator.seek(checkpoint.position)?;

        info!(
            phase = %checkpoint.phase,
            position = checkpoint.position,
            bundles_emitted = checkpoint.bundles_emitted,
            "Restored sequencer from checkpoint"
        );
        Ok(())
    }

    fn emit(&mut self, payload: BundlePayload<W>) -> InputBundle<W> {
        let index = self.bundles_emitted;
        let phase = self.phases[self.current];
        self.bundles_emitted += 1;
        if !matches!(payload, BundlePayload::Empty) {
            self.phase_emitted[self.current] += 1;
        }

        let last_call = !self.any_output_from(self.current);
        if last_call {
            self.done = true;
        }

        let bundle = InputBundle {
            index,
            phase,
            payload,
            first_call: index == 0,
            last_call,
            lineage: self.context.lineage.drain(),
            skipped_items: std::mem::take(&mut self.skipped_items),
        };

        debug!(
            index = index,
            phase = %phase,
            kind = bundle.payload.kind(),
            first_call = bundle.first_call,
            last_call = bundle.last_call,
            producers = bundle.lineage.len(),
            "Emitted bundle"
        );
        bundle
    }

    fn gate_open(&self, index: usize) -> bool {
        match self.gates[index] {
            Some(gate) => self.phase_emitted[gate] > 0,
            None => true,
        }
    }

    fn has_output(&self, index: usize) -> bool {
        self.gate_open(index) && self.slots[index].has_next()
    }

    fn next_phase_with_output(&self, from: usize) -> Option<usize> {
        (from..self.phases.len()).find(|&index| self.has_output(index))
    }

    fn any_output_from(&self, index: usize) -> bool {
        self.has_output(index) || self.next_phase_with_output(index + 1).is_some()
    }

    fn ensure_generator(
        &mut self,
        index: usize,
    ) -> SequencerResult<&mut Box<dyn PhaseGenerator<W>>> {
        if matches!(self.slots[index], PhaseSlot::Pending(_)) {
            let placeholder = PhaseSlot::Pending(PhaseSource::Batch {
                items: Vec::new(),
                require_items: false,
            });
            if let PhaseSlot::Pending(source) = std::mem::replace(&mut self.slots[index], placeholder)
            {
                let generator = self.build_generator(index, source)?;
                debug!(
                    phase = %self.phases[index],
                    generator = generator.description(),
                    "Initialized phase generator"
                );
                self.slots[index] = PhaseSlot::Ready(generator);
            }
        }

        match &mut self.slots[index] {
            PhaseSlot::Ready(generator) => Ok(generator),
            PhaseSlot::Pending(_) => Err(SequencerError::configuration(format!(
                "generator for phase {} was not initialized",
                self.phases[index]
            ))),
        }
    }

    fn build_generator(
        &self,
        index: usize,
        source: PhaseSource<W>,
    ) -> SequencerResult<Box<dyn PhaseGenerator<W>>> {
        match source {
            PhaseSource::Batch { items, .. } => {
                let planner = BatchPlanner::new(
                    items,
                    &self.context.batching,
                    self.context.range,
                    Arc::clone(&self.context.reader),
                    self.context.lineage.clone(),
                )?;
                Ok(Box::new(BatchPhase::new(planner)))
            }
            PhaseSource::Side { producer } => {
                Ok(Box::new(SidePhase::new(self.phases[index], producer)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProducerId, Target, TimeSeriesId};
    use crate::storage::InMemoryTimeSeriesStore;
    use serde_json::json;

    fn range() -> CadenceRange {
        CadenceRange::new(0, 0).unwrap()
    }

    fn target(id: i64, name: &str) -> Target {
        Target::new(id, [TimeSeriesId::new(name)])
    }

    fn context(store: Arc<InMemoryTimeSeriesStore>, max_sample_count: u64) -> PhaseContext {
        let batching = BatchingConfig::for_test()
            .with_max_sample_count(max_sample_count)
            .with_max_read_count(10);
        PhaseContext::new(batching, range(), store)
    }

    fn store_with(names: &[&str]) -> Arc<InMemoryTimeSeriesStore> {
        let store = InMemoryTimeSeriesStore::new();
        for (i, name) in names.iter().enumerate() {
            store.insert_constant(TimeSeriesId::new(name), range(), 1.0, ProducerId(i as i64));
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_empty_phase_skipped_and_flags_set() {
        let store = store_with(&["/a", "/b"]);
        let plan = PhasePlan::new()
            .batch(Phase::Background, vec![])
            .batch(Phase::PpaTargets, vec![target(1, "/a"), target(2, "/b")])
            .side(Phase::MotionPolynomials, || Ok(json!({"order": 3})));
        let mut sequencer = PhaseSequencer::new(plan, context(store, 1)).unwrap();

        let first = sequencer.next_bundle().await.unwrap();
        let second = sequencer.next_bundle().await.unwrap();
        let third = sequencer.next_bundle().await.unwrap();

        assert_eq!(
            [first.phase, second.phase, third.phase],
            [Phase::PpaTargets, Phase::PpaTargets, Phase::MotionPolynomials]
        );
        assert!(first.first_call && !first.last_call);
        assert!(!second.first_call && !second.last_call);
        assert!(third.last_call);
        assert_eq!(third.side_data(), Some(&json!({"order": 3})));
        assert!(sequencer.is_done());

        let err = sequencer.next_bundle().await.unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[tokio::test]
    async fn test_gated_side_phase_skipped_without_gate_output() {
        let store = store_with(&["/t"]);
        let plan = PhasePlan::standard(
            vec![],
            vec![],
            vec![target(1, "/t")],
            || Ok(json!("motion")),
            || Ok(json!("aggregate")),
        );
        let mut sequencer = PhaseSequencer::new(plan, context(store, 10)).unwrap();

        let targets = sequencer.next_bundle().await.unwrap();
        assert_eq!(targets.phase, Phase::Targets);
        assert!(!targets.last_call);

        let aggregate = sequencer.next_bundle().await.unwrap();
        assert_eq!(aggregate.phase, Phase::AggregateResults);
        assert!(aggregate.last_call);
    }

    #[tokio::test]
    async fn test_trailing_unsatisfiable_batch_closes_with_empty_bundle() {
        let store = store_with(&["/a"]);
        let plan = PhasePlan::new()
            .batch(Phase::Targets, vec![target(1, "/a"), target(2, "/missing")]);
        let mut sequencer = PhaseSequencer::new(plan, context(store, 1)).unwrap();

        let first = sequencer.next_bundle().await.unwrap();
        assert!(!first.last_call);

        let closing = sequencer.next_bundle().await.unwrap();
        assert!(closing.last_call);
        assert!(matches!(closing.payload, BundlePayload::Empty));
        assert_eq!(closing.skipped_items, vec!["target:2".to_string()]);
    }

    #[tokio::test]
    async fn test_plan_without_output_is_empty_sequence() {
        let plan: PhasePlan<Target> = PhasePlan::new().batch(Phase::Targets, vec![]);
        let mut sequencer = PhaseSequencer::new(plan, context(store_with(&[]), 1)).unwrap();
        assert!(!sequencer.has_next());
        assert!(matches!(
            sequencer.next_bundle().await,
            Err(SequencerError::EmptySequence)
        ));
    }

    #[tokio::test]
    async fn test_bundle_lineage_is_drained_per_bundle() {
        let store = store_with(&["/a", "/b"]);
        let plan = PhasePlan::new()
            .batch(Phase::Targets, vec![target(1, "/a"), target(2, "/b")]);
        let mut sequencer = PhaseSequencer::new(plan, context(store, 1)).unwrap();

        let first = sequencer.next_bundle().await.unwrap();
        let second = sequencer.next_bundle().await.unwrap();
        assert_eq!(first.lineage.into_iter().collect::<Vec<_>>(), vec![ProducerId(0)]);
        assert_eq!(second.lineage.into_iter().collect::<Vec<_>>(), vec![ProducerId(1)]);
        assert_eq!(sequencer.lineage().cumulative().len(), 2);
    }

    #[tokio::test]
    async fn test_checkpoint_restores_on_fresh_sequencer() {
        let store = store_with(&["/a", "/b", "/c"]);
        let items = || vec![target(1, "/a"), target(2, "/b"), target(3, "/c")];
        let mut original =
            PhaseSequencer::new(PhasePlan::new().batch(Phase::Targets, items()), context(store.clone(), 1))
                .unwrap();
        original.next_bundle().await.unwrap();
        let checkpoint = original.checkpoint();
        assert_eq!(checkpoint.position, 1);

        let json = serde_json::to_string(&checkpoint).unwrap();
        let restored_checkpoint: SequencerCheckpoint = serde_json::from_str(&json).unwrap();

        let mut resumed =
            PhaseSequencer::new(PhasePlan::new().batch(Phase::Targets, items()), context(store, 1))
                .unwrap();
        resumed.restore(&restored_checkpoint).unwrap();

        let next = resumed.next_bundle().await.unwrap();
        assert_eq!(next.index, 1);
        assert!(!next.first_call);
        assert_eq!(next.items()[0].target_id, 2);
    }

    #[tokio::test]
    async fn test_skipped_batch_lineage_reaches_closing_bundle() {
        let store = store_with(&["/a", "/b"]);
        let items = vec![
            target(1, "/a"),
            Target::new(2, [TimeSeriesId::new("/b"), TimeSeriesId::new("/missing")]),
        ];
        let mut sequencer =
            PhaseSequencer::new(PhasePlan::new().batch(Phase::Targets, items), context(store, 1))
                .unwrap();

        let first = sequencer.next_bundle().await.unwrap();
        assert_eq!(first.lineage.into_iter().collect::<Vec<_>>(), vec![ProducerId(0)]);

        let closing = sequencer.next_bundle().await.unwrap();
        assert!(closing.last_call);
        assert!(matches!(closing.payload, BundlePayload::Empty));
        assert_eq!(closing.skipped_items, vec!["target:2".to_string()]);
        assert_eq!(closing.lineage.into_iter().collect::<Vec<_>>(), vec![ProducerId(1)]);
        assert_eq!(
            sequencer.lineage().cumulative().into_iter().collect::<Vec<_>>(),
            vec![ProducerId(0), ProducerId(1)]
        );
    }

    #[tokio::test]
    async fn test_checkpoint_carries_unreported_skipped_items() {
        let store = store_with(&[]);
        let plan = |side_ok: bool| {
            PhasePlan::new()
                .batch(Phase::Targets, vec![target(1, "/missing")])
                .side(Phase::MotionPolynomials, move || {
                    if side_ok {
                        Ok(json!("motion"))
                    } else {
                        Err("polynomial fit unavailable".to_string())
                    }
                })
        };

        let mut original = PhaseSequencer::new(plan(false), context(store.clone(), 1)).unwrap();
        assert!(original.next_bundle().await.is_err());
        let checkpoint = original.checkpoint();
        assert_eq!(checkpoint.skipped_items, vec!["target:1".to_string()]);

        let json = serde_json::to_string(&checkpoint).unwrap();
        let checkpoint: SequencerCheckpoint = serde_json::from_str(&json).unwrap();

        let mut resumed = PhaseSequencer::new(plan(true), context(store, 1)).unwrap();
        resumed.restore(&checkpoint).unwrap();

        let bundle = resumed.next_bundle().await.unwrap();
        assert_eq!(bundle.phase, Phase::MotionPolynomials);
        assert!(bundle.first_call && bundle.last_call);
        assert_eq!(bundle.skipped_items, vec!["target:1".to_string()]);
    }

    #[tokio::test]
    async fn test_restore_rejects_mismatched_plan() {
        let store = store_with(&["/a"]);
        let mut sequencer = PhaseSequencer::new(
            PhasePlan::new().batch(Phase::Targets, vec![target(1, "/a")]),
            context(store, 1),
        )
        .unwrap();
        let checkpoint = SequencerCheckpoint {
            phase_index: 0,
            phase: Phase::Background,
            position: 0,
            phase_emitted: vec![0],
            bundles_emitted: 0,
            skipped_items: vec![],
            done: false,
        };
        assert!(matches!(
            sequencer.restore(&checkpoint),
            Err(SequencerError::InvalidCheckpoint { .. })
        ));
    }

    #[test]
    fn test_empty_plan_rejected() {
        let result = PhaseSequencer::<Target>::new(PhasePlan::new(), context(store_with(&[]), 1));
        assert!(matches!(result, Err(SequencerError::Configuration { .. })));
    }
}

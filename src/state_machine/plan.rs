use super::errors::{SequencerError, SequencerResult};
use super::generator::SideDataFn;
use super::phases::Phase;
use crate::models::WorkItem;
use serde_json::Value;
use std::sync::Arc;

/// Where a phase's bundles come from
pub enum PhaseSource<W> {
    /// Batches planned over these work items
    Batch { items: Vec<W>, require_items: bool },
    /// One side-data bundle
    Side { producer: SideDataFn },
}

impl<W> std::fmt::Debug for PhaseSource<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batch {
                items,
                require_items,
            } => f
                .debug_struct("Batch")
                .field("items", &items.len())
                .field("require_items", require_items)
                .finish(),
            Self::Side { .. } => f.write_str("Side"),
        }
    }
}

/// One row of the phase table
#[derive(Debug)]
pub struct PhaseSpec<W> {
    pub phase: Phase,
    pub source: PhaseSource<W>,
    /// Run only if this earlier phase emitted at least one bundle
    pub gate: Option<Phase>,
}

/// Ordered table of phases a sequencer walks through
#[derive(Debug)]
pub struct PhasePlan<W> {
    specs: Vec<PhaseSpec<W>>,
}

impl<W> Default for PhasePlan<W> {
    fn default() -> Self {
        Self { specs: Vec::new() }
    }
}

impl<W: WorkItem> PhasePlan<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch phase over `items`; skipped when `items` is empty
    pub fn batch(mut self, phase: Phase, items: Vec<W>) -> Self {
        self.specs.push(PhaseSpec {
            phase,
            source: PhaseSource::Batch {
                items,
                require_items: false,
            },
            gate: None,
        });
        self
    }

    /// Batch phase that must have at least one item
    pub fn required_batch(mut self, phase: Phase, items: Vec<W>) -> Self {
        self.specs.push(PhaseSpec {
            phase,
            source: PhaseSource::Batch {
                items,
                require_items: true,
            },
            gate: None,
        });
        self
    }

    /// Side phase emitting the value computed by `producer`
    pub fn side<F>(mut self, phase: Phase, producer: F) -> Self
    where
        F: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        self.specs.push(PhaseSpec {
            phase,
            source: PhaseSource::Side {
                producer: Arc::new(producer),
            },
            gate: None,
        });
        self
    }

    /// Gate the most recently added phase on `gate` having emitted output
    pub fn gated_on(mut self, gate: Phase) -> Self {
        if let Some(last) = self.specs.last_mut() {
            last.gate = Some(gate);
        }
        self
    }

    /// The full pipeline: background and reference-target batches, motion polynomials
    /// when reference targets ran, remaining targets, then aggregation.
    pub fn standard<M, A>(
        background: Vec<W>,
        ppa_targets: Vec<W>,
        targets: Vec<W>,
        motion_polynomials: M,
        aggregate_results: A,
    ) -> Self
    where
        M: Fn() -> Result<Value, String> + Send + Sync + 'static,
        A: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::new()
            .batch(Phase::Background, background)
            .batch(Phase::PpaTargets, ppa_targets)
            .side(Phase::MotionPolynomials, motion_polynomials)
            .gated_on(Phase::PpaTargets)
            .required_batch(Phase::Targets, targets)
            .side(Phase::AggregateResults, aggregate_results)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.specs.iter().map(|s| s.phase).collect()
    }

    /// Check phase order, required items, and gates
    pub fn validate(&self) -> SequencerResult<()> {
        for pair in self.specs.windows(2) {
            if pair[0].phase >= pair[1].phase {
                return Err(SequencerError::configuration(format!(
                    "phase {} must come before {}",
                    pair[1].phase, pair[0].phase
                )));
            }
        }

        for (index, spec) in self.specs.iter().enumerate() {
            if let PhaseSource::Batch {
                items,
                require_items: true,
            } = &spec.source
            {
                if items.is_empty() {
                    return Err(SequencerError::configuration(format!(
                        "phase {} requires work items but none were supplied",
                        spec.phase
                    )));
                }
            }

            if let Some(gate) = spec.gate {
                if !self.specs[..index].iter().any(|s| s.phase == gate) {
                    return Err(SequencerError::configuration(format!(
                        "phase {} is gated on {gate}, which is not an earlier phase of the plan",
                        spec.phase
                    )));
                }
            }
        }

        Ok(())
    }

    pub(crate) fn into_specs(self) -> Vec<PhaseSpec<W>> {
        self.specs
    }
}

use super::dispatcher::SubTaskResult;
use super::errors::AssemblyError;
use crate::state_machine::{group_by_phase, Phase, PhaseGroup};
use std::collections::BTreeMap;

/// Results of one contiguous phase group, in bundle order
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseResults {
    pub group: PhaseGroup,
    pub results: Vec<SubTaskResult>,
}

/// Every result of a task, in bundle order and grouped by phase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledResults {
    pub groups: Vec<PhaseResults>,
}

impl AssembledResults {
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.results.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All results in bundle order
    pub fn ordered(&self) -> impl Iterator<Item = &SubTaskResult> {
        self.groups.iter().flat_map(|g| g.results.iter())
    }

    pub fn results_for(&self, phase: Phase) -> Vec<&SubTaskResult> {
        self.groups
            .iter()
            .filter(|g| g.group.phase == phase)
            .flat_map(|g| g.results.iter())
            .collect()
    }
}

/// Collects out-of-order sub-task results and rebuilds the sequence order.
#[derive(Debug, Default)]
pub struct ResultAssembler {
    expected: BTreeMap<usize, Phase>,
    received: BTreeMap<usize, SubTaskResult>,
}

impl ResultAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dispatched bundle whose result is awaited
    pub fn expect(&mut self, bundle_index: usize, phase: Phase) {
        self.expected.insert(bundle_index, phase);
    }

    pub fn accept(&mut self, result: SubTaskResult) -> Result<(), AssemblyError> {
        let bundle_index = result.bundle_index;
        match self.expected.get(&bundle_index) {
            None => return Err(AssemblyError::UnknownBundle { bundle_index }),
            Some(phase) if *phase != result.phase => {
                return Err(AssemblyError::PhaseMismatch {
                    bundle_index,
                    expected: *phase,
                    actual: result.phase,
                })
            }
            Some(_) => {}
        }
        if self.received.contains_key(&bundle_index) {
            return Err(AssemblyError::DuplicateResult { bundle_index });
        }
        self.received.insert(bundle_index, result);
        Ok(())
    }

    /// Bundle indices still awaiting a result
    pub fn pending(&self) -> Vec<usize> {
        self.expected
            .keys()
            .filter(|index| !self.received.contains_key(index))
            .copied()
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.expected.len() == self.received.len()
    }

    pub fn finish(mut self) -> Result<AssembledResults, AssemblyError> {
        let pending = self.pending();
        if !pending.is_empty() {
            return Err(AssemblyError::MissingResults { pending });
        }

        let groups = group_by_phase(self.expected.iter().map(|(index, phase)| (*index, *phase)))
            .into_iter()
            .map(|group| PhaseResults {
                results: (group.first_index..=group.last_index)
                    .filter_map(|index| self.received.remove(&index))
                    .collect(),
                group,
            })
            .collect();

        Ok(AssembledResults { groups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(index: usize, phase: Phase) -> SubTaskResult {
        SubTaskResult::new(1, index, phase, json!(index))
    }

    #[test]
    fn test_out_of_order_results_reassembled() {
        let mut assembler = ResultAssembler::new();
        assembler.expect(0, Phase::PpaTargets);
        assembler.expect(1, Phase::PpaTargets);
        assembler.expect(2, Phase::Targets);

        assembler.accept(result(2, Phase::Targets)).unwrap();
        assembler.accept(result(0, Phase::PpaTargets)).unwrap();
        assert_eq!(assembler.pending(), vec![1]);
        assembler.accept(result(1, Phase::PpaTargets)).unwrap();

        let assembled = assembler.finish().unwrap();
        let order: Vec<usize> = assembled.ordered().map(|r| r.bundle_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(assembled.groups.len(), 2);
        assert_eq!(assembled.results_for(Phase::PpaTargets).len(), 2);
    }

    #[test]
    fn test_rejects_duplicate_unknown_and_mismatched() {
        let mut assembler = ResultAssembler::new();
        assembler.expect(0, Phase::Targets);

        assert_eq!(
            assembler.accept(result(5, Phase::Targets)),
            Err(AssemblyError::UnknownBundle { bundle_index: 5 })
        );
        assert_eq!(
            assembler.accept(result(0, Phase::Background)),
            Err(AssemblyError::PhaseMismatch {
                bundle_index: 0,
                expected: Phase::Targets,
                actual: Phase::Background,
            })
        );
        assembler.accept(result(0, Phase::Targets)).unwrap();
        assert_eq!(
            assembler.accept(result(0, Phase::Targets)),
            Err(AssemblyError::DuplicateResult { bundle_index: 0 })
        );
    }

    #[test]
    fn test_finish_with_missing_results_fails() {
        let mut assembler = ResultAssembler::new();
        assembler.expect(0, Phase::Targets);
        assembler.expect(1, Phase::Targets);
        assembler.accept(result(1, Phase::Targets)).unwrap();
        assert_eq!(
            assembler.finish(),
            Err(AssemblyError::MissingResults { pending: vec![0] })
        );
    }
}

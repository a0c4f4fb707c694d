use super::cadence::CadenceRange;
use super::identifier::{ProducerId, TimeSeriesId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One stored time series over a fixed cadence range.
///
/// `values` and `gaps` always cover the full range. A series the store does not have is
/// represented with `exists == false` and every cadence gapped, which keeps
/// "not yet read" (no entry at all) apart from "confirmed absent".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    id: TimeSeriesId,
    range: CadenceRange,
    values: Vec<f32>,
    gaps: Vec<bool>,
    exists: bool,
    originators: BTreeSet<ProducerId>,
}

impl Series {
    /// Create a stored series. `values` and `gaps` must match the range length.
    pub fn new(
        id: TimeSeriesId,
        range: CadenceRange,
        values: Vec<f32>,
        gaps: Vec<bool>,
        originators: BTreeSet<ProducerId>,
    ) -> Result<Self, String> {
        if values.len() != range.len() || gaps.len() != range.len() {
            return Err(format!(
                "Series {id} has {} values and {} gap flags for a range of {} cadences",
                values.len(),
                gaps.len(),
                range.len()
            ));
        }
        Ok(Self {
            id,
            range,
            values,
            gaps,
            exists: true,
            originators,
        })
    }

    /// Ungapped series with every cadence set to `value`
    pub fn filled(
        id: TimeSeriesId,
        range: CadenceRange,
        value: f32,
        originators: impl IntoIterator<Item = ProducerId>,
    ) -> Self {
        Self {
            id,
            range,
            values: vec![value; range.len()],
            gaps: vec![false; range.len()],
            exists: true,
            originators: originators.into_iter().collect(),
        }
    }

    /// Series confirmed missing from the store: fully gapped, no producers.
    pub fn absent(id: TimeSeriesId, range: CadenceRange) -> Self {
        Self {
            id,
            range,
            values: vec![0.0; range.len()],
            gaps: vec![true; range.len()],
            exists: false,
            originators: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &TimeSeriesId {
        &self.id
    }

    pub fn range(&self) -> CadenceRange {
        self.range
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn gaps(&self) -> &[bool] {
        &self.gaps
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn originators(&self) -> &BTreeSet<ProducerId> {
        &self.originators
    }

    pub fn gap_count(&self) -> usize {
        self.gaps.iter().filter(|gap| **gap).count()
    }

    pub fn is_fully_gapped(&self) -> bool {
        self.gaps.iter().all(|gap| *gap)
    }
}

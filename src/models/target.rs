use super::identifier::TimeSeriesId;
use super::series::Series;
use super::work_item::{SeriesMap, WorkItem};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// An observed target: the work item the pipeline batches over.
///
/// Each target needs the value and uncertainty series of every pixel in its aperture,
/// expressed here as its set of required identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub target_id: i64,
    #[serde(default)]
    pub labels: Vec<String>,
    required: BTreeSet<TimeSeriesId>,
    #[serde(skip)]
    series: Option<BTreeMap<TimeSeriesId, Arc<Series>>>,
}

impl Target {
    pub fn new(target_id: i64, required: impl IntoIterator<Item = TimeSeriesId>) -> Self {
        Self {
            target_id,
            labels: Vec::new(),
            required: required.into_iter().collect(),
            series: None,
        }
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Populated series in identifier order, `None` until populated
    pub fn series(&self) -> Option<&BTreeMap<TimeSeriesId, Arc<Series>>> {
        self.series.as_ref()
    }

    pub fn series_for(&self, id: &TimeSeriesId) -> Option<&Series> {
        self.series.as_ref()?.get(id).map(Arc::as_ref)
    }
}

impl WorkItem for Target {
    fn item_key(&self) -> String {
        format!("target:{}", self.target_id)
    }

    fn required_identifiers(&self) -> &BTreeSet<TimeSeriesId> {
        &self.required
    }

    fn is_populated(&self) -> bool {
        self.series.is_some()
    }

    fn populate(&mut self, values: &SeriesMap) -> bool {
        let mut collected = BTreeMap::new();
        for id in &self.required {
            match values.get(id) {
                Some(series) => {
                    collected.insert(id.clone(), Arc::clone(series));
                }
                None => return false,
            }
        }
        self.series = Some(collected);
        true
    }

    fn clear(&mut self) {
        self.series = None;
    }
}

use super::identifier::TimeSeriesId;
use super::series::Series;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::sync::Arc;

/// Series payloads handed to [`WorkItem::populate`], keyed by identifier.
pub type SeriesMap = HashMap<TimeSeriesId, Arc<Series>>;

/// An entity that needs a fixed, enumerable set of time series before it can be handed to
/// the external computation engine.
///
/// The identifier set must stay stable for the lifetime of a task: the planner sizes
/// batches and plans reads from it.
pub trait WorkItem: Clone + Debug + Send + Sync + 'static {
    /// Key used when reporting on this item (logs, unsatisfiable notices)
    fn item_key(&self) -> String;

    fn required_identifiers(&self) -> &BTreeSet<TimeSeriesId>;

    /// Cost of the item against the batch budget
    fn time_series_count(&self) -> usize {
        self.required_identifiers().len()
    }

    fn is_populated(&self) -> bool;

    /// Attach series payloads. Returns `true` only when every required identifier is
    /// present in `values`; on `false` the item is left untouched and unpopulated.
    fn populate(&mut self, values: &SeriesMap) -> bool;

    /// Drop series payloads once the bundle holding them has been consumed
    fn clear(&mut self);
}

use super::cache::{BoundedCache, CacheStats};
use super::errors::{BatchError, BatchResult};
use crate::config::BatchingConfig;
use crate::lineage::SharedLineageTracker;
use crate::models::{CadenceRange, ProducerId, TimeSeriesId, WorkItem};
use crate::storage::TimeSeriesReader;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A work item that can never be populated because the store lacks some of its series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsatisfiableItem {
    pub index: usize,
    pub item_key: String,
    pub absent_ids: Vec<TimeSeriesId>,
}

/// One planned batch: the populated items of `start_index..end_index`, in order
#[derive(Debug, Clone)]
pub struct Batch<W> {
    pub start_index: usize,
    pub end_index: usize,
    pub items: Vec<W>,
    pub unsatisfiable: Vec<UnsatisfiableItem>,
}

impl<W: WorkItem> Batch<W> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn time_series_count(&self) -> usize {
        self.items.iter().map(WorkItem::time_series_count).sum()
    }

    pub fn item_keys(&self) -> Vec<String> {
        self.items.iter().map(WorkItem::item_key).collect()
    }
}

/// Greedy prefix of `items` starting at `start` whose total series count stays within
/// `max_time_series_count`. An item over budget on its own is selected alone.
pub fn select_batch<W: WorkItem>(
    items: &[W],
    start: usize,
    max_time_series_count: usize,
) -> Range<usize> {
    let mut end = start;
    let mut total = 0usize;
    while end < items.len() {
        let count = items[end].time_series_count();
        if end > start && total + count > max_time_series_count {
            break;
        }
        total += count;
        end += 1;
    }
    start..end
}

/// `max(1, max_sample_count / cadence_count)`
pub fn max_time_series_count(max_sample_count: u64, range: CadenceRange) -> usize {
    let per_series = range.len() as u64;
    let count = max_sample_count / per_series.max(1);
    usize::try_from(count).unwrap_or(usize::MAX).max(1)
}

/// Turns an ordered list of work items into successive populated batches.
///
/// Each batch is a greedy prefix bounded by the series budget derived from
/// `max_sample_count`. Series are pulled through a [`BoundedCache`] in reads of at most
/// `max_read_count` identifiers. When prefetch is enabled, spare read capacity is filled
/// with whole upcoming items, and those identifiers survive eviction until their batch.
pub struct BatchPlanner<W: WorkItem> {
    items: Vec<W>,
    cursor: usize,
    previous: Option<Range<usize>>,
    unsatisfiable: BTreeMap<usize, Vec<TimeSeriesId>>,
    cache: BoundedCache,
    reader: Arc<dyn TimeSeriesReader>,
    lineage: SharedLineageTracker,
    range: CadenceRange,
    max_time_series_count: usize,
    max_read_count: usize,
    prefetch_enabled: bool,
    prefetch_window: Range<usize>,
    unrecorded_producers: BTreeSet<ProducerId>,
    latest_producers: BTreeSet<ProducerId>,
}

impl<W: WorkItem> std::fmt::Debug for BatchPlanner<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPlanner")
            .field("items", &self.items.len())
            .field("cursor", &self.cursor)
            .field("range", &self.range)
            .field("max_time_series_count", &self.max_time_series_count)
            .field("max_read_count", &self.max_read_count)
            .field("prefetch_enabled", &self.prefetch_enabled)
            .field("reader", &self.reader.description())
            .finish()
    }
}

impl<W: WorkItem> BatchPlanner<W> {
    pub fn new(
        items: Vec<W>,
        config: &BatchingConfig,
        range: CadenceRange,
        reader: Arc<dyn TimeSeriesReader>,
        lineage: SharedLineageTracker,
    ) -> BatchResult<Self> {
        config
            .validate()
            .map_err(|e| BatchError::configuration(e.to_string()))?;

        let cache = BoundedCache::new(range, config.max_read_count)?;
        let max_time_series_count = max_time_series_count(config.max_sample_count, range);

        debug!(
            items = items.len(),
            range = %range,
            max_time_series_count = max_time_series_count,
            max_read_count = config.max_read_count,
            prefetch_enabled = config.prefetch_enabled,
            reader = reader.description(),
            "Created batch planner"
        );

        Ok(Self {
            items,
            cursor: 0,
            previous: None,
            unsatisfiable: BTreeMap::new(),
            cache,
            reader,
            lineage,
            range,
            max_time_series_count,
            max_read_count: config.max_read_count,
            prefetch_enabled: config.prefetch_enabled,
            prefetch_window: 0..0,
            unrecorded_producers: BTreeSet::new(),
            latest_producers: BTreeSet::new(),
        })
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.items.len()
    }

    /// Plan, populate and return the next batch.
    ///
    /// The cursor moves past the batch only when this returns `Ok` or
    /// [`BatchError::AllUnsatisfiable`]. After a storage failure the same call can be
    /// retried; series cached before the failure are reused, not re-read.
    #[instrument(skip_all, fields(cursor = self.cursor, total = self.items.len()))]
    pub async fn next_batch(&mut self) -> BatchResult<Batch<W>> {
        if !self.has_next() {
            return Err(BatchError::exhausted(self.cursor, self.items.len()));
        }

        self.clear_previous();

        let selection = select_batch(&self.items, self.cursor, self.max_time_series_count);
        self.unsatisfiable
            .retain(|index, _| selection.contains(index));
        self.align_prefetch_window(&selection);

        self.populate_until_converged(&selection).await?;

        let retained = self.live_prefetch_ids(&selection);
        self.cache.evict(&retained);

        self.cursor = selection.end;
        self.previous = Some(selection.clone());

        let producers = std::mem::take(&mut self.unrecorded_producers);
        let unsatisfiable: Vec<UnsatisfiableItem> = std::mem::take(&mut self.unsatisfiable)
            .into_iter()
            .map(|(index, absent_ids)| UnsatisfiableItem {
                index,
                item_key: self.items[index].item_key(),
                absent_ids,
            })
            .collect();

        let items: Vec<W> = self.items[selection.clone()]
            .iter()
            .filter(|item| item.is_populated())
            .cloned()
            .collect();

        // Reads for a skipped batch still count toward lineage
        self.lineage.record(producers.iter().copied());

        if items.is_empty() {
            let keys = unsatisfiable.into_iter().map(|u| u.item_key).collect();
            warn!(
                start_index = selection.start,
                end_index = selection.end,
                "Every work item in batch is unsatisfiable"
            );
            return Err(BatchError::all_unsatisfiable(selection.start, keys));
        }

        self.latest_producers = producers;

        if !unsatisfiable.is_empty() {
            warn!(
                start_index = selection.start,
                unsatisfiable = unsatisfiable.len(),
                "Batch contains unsatisfiable work items"
            );
        }

        info!(
            start_index = selection.start,
            end_index = selection.end,
            populated = items.len(),
            unsatisfiable = unsatisfiable.len(),
            cached = self.cache.len(),
            "Planned batch"
        );

        Ok(Batch {
            start_index: selection.start,
            end_index: selection.end,
            items,
            unsatisfiable,
        })
    }

    /// Clear every item and cached series and move back to the first item
    pub fn reset(&mut self) {
        self.reposition(0);
        self.unrecorded_producers.clear();
        self.latest_producers.clear();
    }

    /// Reposition at `position` with an empty cache, as after a restore
    pub fn seek(&mut self, position: usize) -> BatchResult<()> {
        if position > self.items.len() {
            return Err(BatchError::invalid_position(position, self.items.len()));
        }
        self.reposition(position);
        Ok(())
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[W] {
        &self.items
    }

    pub fn max_time_series_count(&self) -> usize {
        self.max_time_series_count
    }

    pub fn range(&self) -> CadenceRange {
        self.range
    }

    /// Producers of the series read for the most recent successful batch
    pub fn latest_producers(&self) -> &BTreeSet<ProducerId> {
        &self.latest_producers
    }

    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    /// Identifiers currently held by the cache
    pub fn cached_ids(&self) -> BTreeSet<TimeSeriesId> {
        self.cache.cached_ids().cloned().collect()
    }

    fn reposition(&mut self, position: usize) {
        for item in &mut self.items {
            item.clear();
        }
        self.cache.clear();
        self.unsatisfiable.clear();
        self.previous = None;
        self.prefetch_window = position..position;
        self.cursor = position;
    }

    fn clear_previous(&mut self) {
        if let Some(previous) = self.previous.take() {
            for item in &mut self.items[previous] {
                item.clear();
            }
        }
    }

    fn align_prefetch_window(&mut self, selection: &Range<usize>) {
        let start = self.prefetch_window.start.max(selection.end);
        let end = self.prefetch_window.end.max(start);
        self.prefetch_window = start..end;
    }

    fn is_pending(&self, index: usize) -> bool {
        !self.items[index].is_populated() && !self.unsatisfiable.contains_key(&index)
    }

    /// Populate, evict, and refill until no item of `selection` is waiting on a read
    async fn populate_until_converged(&mut self, selection: &Range<usize>) -> BatchResult<()> {
        loop {
            let mut missing = BTreeSet::new();
            let mut live = BTreeSet::new();

            for index in selection.clone() {
                if !self.is_pending(index) {
                    continue;
                }
                let lookup = self.cache.get(self.items[index].required_identifiers());
                let absent = lookup.absent_ids();
                if !absent.is_empty() {
                    // One confirmed-absent series is enough; the rest are not read
                    debug!(
                        index = index,
                        item_key = %self.items[index].item_key(),
                        absent = absent.len(),
                        "Work item is unsatisfiable"
                    );
                    self.unsatisfiable.insert(index, absent);
                    continue;
                }
                if lookup.is_complete() && self.items[index].populate(&lookup.hits) {
                    continue;
                }
                live.extend(self.items[index].required_identifiers().iter().cloned());
                missing.extend(lookup.misses);
            }

            live.extend(self.live_prefetch_ids(selection));
            self.cache.evict(&live);

            if missing.is_empty() {
                return Ok(());
            }

            let (request, prefetch) = self.plan_read(missing);
            let outcome = self.cache.refill(&request, self.reader.as_ref()).await?;
            self.unrecorded_producers.extend(outcome.producers);
            if let Some(prefetch) = prefetch {
                self.commit_prefetch(prefetch);
            }
        }
    }

    /// Identifiers of prefetched items after `selection` that must survive eviction
    fn live_prefetch_ids(&self, selection: &Range<usize>) -> BTreeSet<TimeSeriesId> {
        if !self.prefetch_enabled {
            return BTreeSet::new();
        }
        let start = self.prefetch_window.start.max(selection.end);
        let end = self.prefetch_window.end.min(self.items.len());
        (start..end.max(start))
            .flat_map(|index| self.items[index].required_identifiers().iter().cloned())
            .collect()
    }

    /// Choose the identifiers for the next read: an ordered prefix of `missing` when it
    /// exceeds the read bound, otherwise all of it plus whole upcoming items that still fit.
    ///
    /// The prefetch extension is returned rather than applied; it takes effect only once
    /// the read succeeds.
    fn plan_read(
        &self,
        missing: BTreeSet<TimeSeriesId>,
    ) -> (BTreeSet<TimeSeriesId>, Option<PrefetchExtension>) {
        if missing.len() >= self.max_read_count {
            return (missing.into_iter().take(self.max_read_count).collect(), None);
        }

        let mut request = missing;
        if !self.prefetch_enabled {
            return (request, None);
        }

        let mut prefetched = 0;
        let mut next = self.prefetch_window.end;
        while next < self.items.len() {
            let needed: Vec<&TimeSeriesId> = self.items[next]
                .required_identifiers()
                .iter()
                .filter(|id| !self.cache.contains(id) && !request.contains(*id))
                .collect();
            if request.len() + needed.len() > self.max_read_count {
                break;
            }
            prefetched += needed.len();
            request.extend(needed.into_iter().cloned());
            next += 1;
        }

        let extension = (next > self.prefetch_window.end).then_some(PrefetchExtension {
            window_end: next,
            prefetched,
        });
        (request, extension)
    }

    fn commit_prefetch(&mut self, extension: PrefetchExtension) {
        debug!(
            from = self.prefetch_window.end,
            to = extension.window_end,
            prefetched = extension.prefetched,
            "Extended read with upcoming work items"
        );
        self.prefetch_window.end = extension.window_end;
        self.cache.record_prefetch(extension.prefetched);
    }
}

/// Upcoming items folded into a read, applied after the read succeeds
#[derive(Debug, Clone, Copy)]
struct PrefetchExtension {
    window_end: usize,
    prefetched: usize,
}

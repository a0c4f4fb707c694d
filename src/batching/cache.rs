use super::errors::{BatchError, BatchResult};
use crate::logging::log_cache_operation;
use crate::models::{CadenceRange, ProducerId, Series, SeriesMap, TimeSeriesId};
use crate::storage::{StorageError, TimeSeriesReader};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Counters accumulated over the lifetime of a cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub reads: u64,
    pub ids_read: u64,
    pub ids_absent: u64,
    pub evicted: u64,
    pub prefetched: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Result of looking a set of identifiers up in the cache
#[derive(Debug, Default)]
pub struct CacheLookup {
    pub hits: SeriesMap,
    pub misses: BTreeSet<TimeSeriesId>,
}

impl CacheLookup {
    pub fn is_complete(&self) -> bool {
        self.misses.is_empty()
    }

    /// Cached identifiers the store confirmed it does not have
    pub fn absent_ids(&self) -> Vec<TimeSeriesId> {
        let mut absent: Vec<_> = self
            .hits
            .values()
            .filter(|s| !s.exists())
            .map(|s| s.id().clone())
            .collect();
        absent.sort();
        absent
    }
}

/// What a successful refill added to the cache
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefillOutcome {
    pub read: usize,
    pub absent: BTreeSet<TimeSeriesId>,
    pub producers: BTreeSet<ProducerId>,
}

/// Read-through cache of time series for one cadence range.
///
/// Entries are only dropped through [`evict`](BoundedCache::evict), by liveness against the
/// identifiers the caller still needs. A series the store reports absent is cached as an
/// explicit absent entry so it is never requested again.
#[derive(Debug)]
pub struct BoundedCache {
    entries: BTreeMap<TimeSeriesId, Arc<Series>>,
    range: CadenceRange,
    max_read_count: usize,
    stats: CacheStats,
}

impl BoundedCache {
    pub fn new(range: CadenceRange, max_read_count: usize) -> BatchResult<Self> {
        if max_read_count == 0 {
            return Err(BatchError::configuration(
                "max_read_count must be greater than 0",
            ));
        }
        Ok(Self {
            entries: BTreeMap::new(),
            range,
            max_read_count,
            stats: CacheStats::default(),
        })
    }

    pub fn get(&mut self, ids: &BTreeSet<TimeSeriesId>) -> CacheLookup {
        let mut lookup = CacheLookup {
            hits: HashMap::with_capacity(ids.len()),
            misses: BTreeSet::new(),
        };
        for id in ids {
            match self.entries.get(id) {
                Some(series) => {
                    lookup.hits.insert(id.clone(), Arc::clone(series));
                }
                None => {
                    lookup.misses.insert(id.clone());
                }
            }
        }
        self.stats.hits += lookup.hits.len() as u64;
        self.stats.misses += lookup.misses.len() as u64;
        lookup
    }

    pub fn contains(&self, id: &TimeSeriesId) -> bool {
        self.entries.contains_key(id)
    }

    /// Read `ids` from `reader` and cache the result.
    ///
    /// The response is validated in full before anything is cached, so a failed refill
    /// leaves the cache exactly as it was.
    pub async fn refill(
        &mut self,
        ids: &BTreeSet<TimeSeriesId>,
        reader: &dyn TimeSeriesReader,
    ) -> BatchResult<RefillOutcome> {
        if ids.is_empty() {
            return Ok(RefillOutcome::default());
        }
        if ids.len() > self.max_read_count {
            return Err(BatchError::configuration(format!(
                "refill of {} identifiers exceeds max_read_count {}",
                ids.len(),
                self.max_read_count
            )));
        }

        let response = reader.read(ids, self.range).await.map_err(|e| match e {
            StorageError::Unavailable { message } => {
                StorageError::read_failed(ids, self.range, message)
            }
            other => other,
        })?;

        let mut staged: BTreeMap<TimeSeriesId, Arc<Series>> = BTreeMap::new();
        for series in response {
            if !ids.contains(series.id()) {
                return Err(StorageError::unexpected_series(series.id().clone()).into());
            }
            if series.range() != self.range {
                return Err(StorageError::range_mismatch(
                    series.id().clone(),
                    self.range,
                    series.range(),
                )
                .into());
            }
            let series = if series.exists() {
                series
            } else {
                Series::absent(series.id().clone(), self.range)
            };
            staged.insert(series.id().clone(), Arc::new(series));
        }

        for id in ids {
            if !staged.contains_key(id) {
                warn!(
                    series_id = %id,
                    reader = reader.description(),
                    "Reader omitted requested series, caching as absent"
                );
                staged.insert(id.clone(), Arc::new(Series::absent(id.clone(), self.range)));
            }
        }

        let mut outcome = RefillOutcome {
            read: staged.len(),
            ..RefillOutcome::default()
        };
        for (id, series) in staged {
            if series.exists() {
                outcome.producers.extend(series.originators().iter().copied());
            } else {
                outcome.absent.insert(id.clone());
            }
            self.entries.insert(id, series);
        }

        self.stats.reads += 1;
        self.stats.ids_read += outcome.read as u64;
        self.stats.ids_absent += outcome.absent.len() as u64;

        log_cache_operation(
            "refill",
            ids.len(),
            outcome.absent.len(),
            self.entries.len(),
            "ok",
        );

        Ok(outcome)
    }

    /// Drop every entry whose identifier is not in `still_needed`. Returns the count dropped.
    pub fn evict(&mut self, still_needed: &BTreeSet<TimeSeriesId>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| still_needed.contains(id));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            self.stats.evicted += evicted as u64;
            debug!(
                evicted = evicted,
                remaining = self.entries.len(),
                "Evicted series no longer needed"
            );
        }
        evicted
    }

    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.stats.evicted += dropped as u64;
    }

    pub fn record_prefetch(&mut self, count: usize) {
        self.stats.prefetched += count as u64;
    }

    pub fn cached_ids(&self) -> impl Iterator<Item = &TimeSeriesId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn range(&self) -> CadenceRange {
        self.range
    }

    pub fn max_read_count(&self) -> usize {
        self.max_read_count
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

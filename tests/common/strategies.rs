use proptest::prelude::*;

/// Series counts of an ordered list of work items
pub fn item_sizes_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..=8, 0..40)
}

/// Per-batch series budget, sometimes smaller than the largest item
pub fn series_budget_strategy() -> impl Strategy<Value = usize> {
    1usize..=12
}

/// Maximum identifiers per storage read
pub fn read_count_strategy() -> impl Strategy<Value = usize> {
    1usize..=10
}

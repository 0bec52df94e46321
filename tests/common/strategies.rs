//! Proptest strategies for fan-out inputs

use proptest::prelude::*;

/// Non-empty work lists of moderate size
pub fn work_items_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(any::<u32>(), 1..40)
}

/// A work list together with a batch limit that is valid for it
pub fn limited_work_strategy() -> impl Strategy<Value = (Vec<u32>, usize)> {
    prop::collection::vec(any::<u32>(), 2..40).prop_flat_map(|items| {
        let len = items.len();
        (Just(items), 0..len)
    })
}

/// A work list and the index of the single element that fails
pub fn failing_index_strategy() -> impl Strategy<Value = (Vec<u32>, usize)> {
    work_items_strategy().prop_flat_map(|items| {
        let len = items.len();
        (Just(items), 0..len)
    })
}

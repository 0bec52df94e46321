//! Write-once result store keyed by task index.

use crate::error::{FanOutError, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::warn;

/// Thread-safe store mapping a task's original index to its result
///
/// Every worker writes exactly one slot. The aggregator reads the slots back in index
/// order once the call has concluded. Each slot sits behind its own lock, so results
/// only need to be `Send`.
#[derive(Debug)]
pub struct ResultCollector<R> {
    slots: DashMap<usize, Mutex<R>>,
}

impl<R> Default for ResultCollector<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ResultCollector<R> {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: DashMap::with_capacity(capacity),
        }
    }

    /// Store the result for `index`; a second write to the same index replaces the first
    pub fn store(&self, index: usize, value: R) {
        if self.slots.insert(index, Mutex::new(value)).is_some() {
            warn!(index = index, "Result slot written twice, keeping the latest value");
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.slots.contains_key(&index)
    }

    /// Visit every stored entry, in no particular order
    pub fn for_each(&self, mut visit: impl FnMut(usize, &R)) {
        for entry in self.slots.iter() {
            visit(*entry.key(), &entry.value().lock());
        }
    }

    /// Drain slots `0..expected` into a vector ordered by index
    ///
    /// Fails if any slot in the range is missing. Entries outside the range are left
    /// in place.
    pub fn take_ordered(&self, expected: usize) -> Result<Vec<R>> {
        let mut ordered = Vec::with_capacity(expected);
        for index in 0..expected {
            match self.slots.remove(&index) {
                Some((_, slot)) => ordered.push(slot.into_inner()),
                None => {
                    return Err(FanOutError::Internal(format!(
                        "Missing result for task {index} of {expected}"
                    )))
                }
            }
        }
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Arc;

    #[test]
    fn take_ordered_follows_index_not_insertion_order() {
        let collector = ResultCollector::new();
        collector.store(2, "c");
        collector.store(0, "a");
        collector.store(1, "b");

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.take_ordered(3).unwrap(), vec!["a", "b", "c"]);
        assert!(collector.is_empty());
    }

    #[test]
    fn missing_slot_is_an_internal_error() {
        let collector = ResultCollector::new();
        collector.store(0, 10);
        collector.store(2, 30);

        let err = collector.take_ordered(3).unwrap_err();
        assert!(matches!(err, FanOutError::Internal(_)));
        assert!(err.to_string().contains("task 1"));
    }

    #[test]
    fn second_write_overwrites() {
        let collector = ResultCollector::new();
        collector.store(0, 1);
        collector.store(0, 2);

        assert_eq!(collector.len(), 1);
        assert_eq!(collector.take_ordered(1).unwrap(), vec![2]);
    }

    #[test]
    fn for_each_sees_every_entry() {
        let collector = ResultCollector::with_capacity(4);
        for index in 0..4 {
            collector.store(index, index * 10);
        }

        let mut sum = 0;
        collector.for_each(|index, value| {
            assert_eq!(*value, index * 10);
            sum += value;
        });
        assert_eq!(sum, 60);
        assert!(collector.contains(3));
        assert!(!collector.contains(4));
    }

    #[test]
    fn concurrent_writers_each_land_in_their_own_slot() {
        let collector = Arc::new(ResultCollector::new());
        let handles: Vec<_> = (0..16)
            .map(|index| {
                let collector = Arc::clone(&collector);
                std::thread::spawn(move || collector.store(index, index * 2))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let expected: Vec<usize> = (0..16).map(|i| i * 2).collect();
        assert_eq!(collector.take_ordered(16).unwrap(), expected);
    }

    #[test]
    fn values_need_not_be_sync() {
        let collector = Arc::new(ResultCollector::new());
        let writer = Arc::clone(&collector);
        std::thread::spawn(move || writer.store(0, Cell::new(5)))
            .join()
            .unwrap();

        let values = collector.take_ordered(1).unwrap();
        assert_eq!(values[0].get(), 5);
    }
}

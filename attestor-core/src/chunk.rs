//! Deterministic chunk partitioning of a discovered account sequence.
//!
//! Chunk boundaries are a pure function of the discovery order and the chunk
//! size, so a resumed run re-derives exactly the chunks the interrupted run
//! saw and can pick up at a chunk index instead of re-scanning.

use serde::{Deserialize, Serialize};

/// Partition plan for a sequence of `total` items into consecutive chunks of
/// `size` (the last chunk may be shorter). `size` must be at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    total: u64,
    size: u64,
}

impl ChunkPlan {
    pub fn new(total: u64, size: u64) -> Self {
        assert!(size >= 1, "chunk size must be at least 1");
        Self { total, size }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of chunks in the plan.
    pub fn count(&self) -> u64 {
        self.total.div_ceil(self.size)
    }

    /// Item bounds `[start, end)` of chunk `index`, or `None` past the end.
    pub fn bounds(&self, index: u64) -> Option<(u64, u64)> {
        if index >= self.count() {
            return None;
        }
        let start = index * self.size;
        let end = (start + self.size).min(self.total);
        Some((start, end))
    }

    /// Slice out chunk `index` from the sequence the plan was built over.
    pub fn slice<'a, T>(&self, items: &'a [T], index: u64) -> Option<&'a [T]> {
        debug_assert_eq!(items.len() as u64, self.total);
        let (start, end) = self.bounds(index)?;
        Some(&items[start as usize..end as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_count_exact_and_ragged() {
        assert_eq!(ChunkPlan::new(10, 5).count(), 2);
        assert_eq!(ChunkPlan::new(11, 5).count(), 3);
        assert_eq!(ChunkPlan::new(0, 5).count(), 0);
        assert_eq!(ChunkPlan::new(3, 5).count(), 1);
    }

    #[test]
    fn test_bounds_past_end() {
        let plan = ChunkPlan::new(10, 5);
        assert_eq!(plan.bounds(0), Some((0, 5)));
        assert_eq!(plan.bounds(1), Some((5, 10)));
        assert_eq!(plan.bounds(2), None);
    }

    #[test]
    fn test_slice_preserves_order() {
        let items: Vec<u32> = (0..7).collect();
        let plan = ChunkPlan::new(7, 3);
        assert_eq!(plan.slice(&items, 0).unwrap(), &[0, 1, 2]);
        assert_eq!(plan.slice(&items, 1).unwrap(), &[3, 4, 5]);
        assert_eq!(plan.slice(&items, 2).unwrap(), &[6]);
    }

    proptest! {
        #[test]
        fn chunks_partition_exactly(total in 0u64..5_000, size in 1u64..64) {
            let plan = ChunkPlan::new(total, size);

            let mut cursor = 0u64;
            for index in 0..plan.count() {
                let (start, end) = plan.bounds(index).unwrap();
                prop_assert_eq!(start, cursor);
                prop_assert!(end > start);
                prop_assert!(end - start <= size);
                cursor = end;
            }
            prop_assert_eq!(cursor, total);
            prop_assert_eq!(plan.bounds(plan.count()), None);
        }
    }
}

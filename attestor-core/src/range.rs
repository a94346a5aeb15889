//! Half-open block ranges, the unit of discovery replay and checkpointing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open interval `[start, end)` over the ledger's block index.
///
/// Ranges in a migration sweep are contiguous and non-overlapping: the `end`
/// of one sub-range is the `start` of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

impl BlockRange {
    /// Create a range, rejecting `start > end`. An empty range
    /// (`start == end`) is valid and scans nothing.
    pub fn new(start: u64, end: u64) -> Result<Self, InvalidBlockRange> {
        if start > end {
            return Err(InvalidBlockRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn contains(&self, block: u64) -> bool {
        block >= self.start && block < self.end
    }

    /// Split into contiguous sub-ranges of at most `step` blocks, in order.
    /// The sub-ranges exactly cover `self` without overlap; the last one may
    /// be short. `step` must be at least 1.
    pub fn split(&self, step: u64) -> Vec<BlockRange> {
        assert!(step >= 1, "split step must be at least 1");
        let mut ranges = Vec::new();
        let mut cursor = self.start;
        while cursor < self.end {
            let end = cursor.saturating_add(step).min(self.end);
            ranges.push(BlockRange { start: cursor, end });
            cursor = end;
        }
        ranges
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Error when constructing a backwards block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid block range: start {start} > end {end}")]
pub struct InvalidBlockRange {
    pub start: u64,
    pub end: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_rejects_backwards_range() {
        assert!(BlockRange::new(10, 5).is_err());
        assert!(BlockRange::new(5, 5).is_ok());
    }

    #[test]
    fn test_empty_range_splits_to_nothing() {
        let range = BlockRange::new(7, 7).unwrap();
        assert!(range.is_empty());
        assert!(range.split(100).is_empty());
    }

    #[test]
    fn test_split_exact_and_ragged() {
        let range = BlockRange::new(0, 10).unwrap();
        let even = range.split(5);
        assert_eq!(even.len(), 2);
        assert_eq!(even[0], BlockRange { start: 0, end: 5 });
        assert_eq!(even[1], BlockRange { start: 5, end: 10 });

        let ragged = range.split(4);
        assert_eq!(ragged.len(), 3);
        assert_eq!(ragged[2], BlockRange { start: 8, end: 10 });
    }

    proptest! {
        #[test]
        fn split_covers_contiguously(
            start in 0u64..1_000_000,
            len in 0u64..10_000,
            step in 1u64..500,
        ) {
            let range = BlockRange::new(start, start + len).unwrap();
            let parts = range.split(step);

            let mut cursor = range.start;
            for part in &parts {
                // Contiguous, non-overlapping, forward progress.
                prop_assert_eq!(part.start, cursor);
                prop_assert!(part.end > part.start);
                prop_assert!(part.len() <= step);
                cursor = part.end;
            }
            prop_assert_eq!(cursor, range.end);
        }
    }
}

//! Inclusive block ranges and the chunking rule used to size RPC requests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An inclusive range of block heights.
///
/// Both bounds are part of the range, so `BlockRange::new(5, 5)` spans exactly
/// one block. Construction enforces `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockRange {
    start: u64,
    end: u64,
}

impl BlockRange {
    /// Creates a new range, rejecting inverted bounds.
    pub const fn new(start: u64, end: u64) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a range without checking the bounds.
    ///
    /// Callers must guarantee `start <= end`.
    pub(crate) const fn new_unchecked(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Creates a single-block range.
    pub const fn single(block: u64) -> Self {
        Self { start: block, end: block }
    }

    /// The first block of the range.
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// The last block of the range.
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Number of blocks covered by the range. Never zero.
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// An inclusive range is never empty.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Whether `block` lies within the range.
    pub const fn contains(&self, block: u64) -> bool {
        self.start <= block && block <= self.end
    }

    /// Whether the two ranges share at least one block.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Whether `other` lies entirely within `self`.
    pub const fn covers(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The blocks common to both ranges, if any.
    pub const fn intersect(&self, other: &Self) -> Option<Self> {
        let start = if self.start > other.start { self.start } else { other.start };
        let end = if self.end < other.end { self.end } else { other.end };
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    /// Shrinks the range so it ends at `max_end`, dropping it entirely when
    /// even the start is beyond that height.
    pub const fn clamp_end(&self, max_end: u64) -> Option<Self> {
        if self.start > max_end {
            return None;
        }
        let end = if self.end < max_end { self.end } else { max_end };
        Some(Self { start: self.start, end })
    }
}

impl core::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Errors produced by range construction and chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The start of the range is beyond its end.
    #[error("invalid block range: start {start} is beyond end {end}")]
    Inverted {
        /// Requested start block.
        start: u64,
        /// Requested end block.
        end: u64,
    },
    /// A chunk size of zero blocks was requested.
    #[error("chunk size must be at least one block")]
    EmptyChunk,
}

/// Splits `range` into consecutive sub-ranges of at most `chunk_size` blocks.
///
/// Every sub-range except the last spans exactly `chunk_size` blocks, the
/// sub-ranges are contiguous and in ascending order, and together they cover
/// `range` exactly. A range shorter than `chunk_size` yields itself as the
/// only element.
pub fn split_range(range: BlockRange, chunk_size: u64) -> Result<Vec<BlockRange>, RangeError> {
    if chunk_size == 0 {
        return Err(RangeError::EmptyChunk);
    }

    let mut chunks = Vec::with_capacity((range.len() / chunk_size + 1) as usize);
    let mut start = range.start();
    loop {
        let end = start.saturating_add(chunk_size - 1).min(range.end());
        chunks.push(BlockRange::new_unchecked(start, end));
        if end == range.end() {
            return Ok(chunks);
        }
        start = end + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn range(start: u64, end: u64) -> BlockRange {
        BlockRange::new(start, end).unwrap()
    }

    #[test]
    fn rejects_inverted_bounds() {
        assert_eq!(BlockRange::new(710, 390), Err(RangeError::Inverted { start: 710, end: 390 }));
    }

    #[test]
    fn single_block_range_has_length_one() {
        let r = BlockRange::single(42);
        assert_eq!(r.len(), 1);
        assert!(r.contains(42));
        assert!(!r.contains(41));
    }

    #[test]
    fn splits_partial_tail_chunk() {
        let chunks = split_range(range(390, 710), 100).unwrap();
        let expected = vec![range(390, 489), range(490, 589), range(590, 689), range(690, 710)];
        assert_eq!(chunks, expected);
    }

    #[test]
    fn splits_exact_multiple_without_tail() {
        let chunks = split_range(range(0, 199), 100).unwrap();
        assert_eq!(chunks, vec![range(0, 99), range(100, 199)]);
    }

    #[test]
    fn short_range_yields_itself() {
        assert_eq!(split_range(range(5, 7), 100).unwrap(), vec![range(5, 7)]);
        assert_eq!(split_range(range(9, 9), 1).unwrap(), vec![range(9, 9)]);
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert_eq!(split_range(range(0, 10), 0), Err(RangeError::EmptyChunk));
    }

    #[test]
    fn intersect_and_overlap_agree() {
        let a = range(10, 20);
        assert_eq!(a.intersect(&range(15, 30)), Some(range(15, 20)));
        assert_eq!(a.intersect(&range(21, 30)), None);
        assert!(a.overlaps(&range(20, 25)));
        assert!(!a.overlaps(&range(21, 25)));
        assert!(range(0, 100).covers(&a));
        assert!(!a.covers(&range(10, 21)));
    }

    #[test]
    fn clamp_end_trims_or_drops() {
        assert_eq!(range(10, 20).clamp_end(15), Some(range(10, 15)));
        assert_eq!(range(10, 20).clamp_end(25), Some(range(10, 20)));
        assert_eq!(range(10, 20).clamp_end(9), None);
    }

    proptest! {
        #[test]
        fn chunks_partition_the_range(
            start in 0u64..1_000_000,
            span in 0u64..10_000,
            chunk_size in 1u64..2_000,
        ) {
            let full = range(start, start + span);
            let chunks = split_range(full, chunk_size).unwrap();

            prop_assert_eq!(chunks.first().unwrap().start(), full.start());
            prop_assert_eq!(chunks.last().unwrap().end(), full.end());
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[1].start(), pair[0].end() + 1);
            }
            for (i, chunk) in chunks.iter().enumerate() {
                if i + 1 == chunks.len() {
                    prop_assert!(chunk.len() <= chunk_size);
                } else {
                    prop_assert_eq!(chunk.len(), chunk_size);
                }
            }
        }
    }
}

//! Interval arithmetic over cached block ranges.
//!
//! The cache rarely holds exactly the range a caller asks for. These
//! functions normalize what the ledger says is covered and compute the
//! minimal set of gaps that still has to be fetched from the node.

use crate::BlockRange;

/// Collapses a set of ranges into sorted, disjoint, maximal ranges.
///
/// Overlapping and immediately adjacent ranges are merged, so the result
/// never contains two ranges that could be expressed as one.
pub fn merge_ranges(mut ranges: Vec<BlockRange>) -> Vec<BlockRange> {
    ranges.sort_unstable();

    let mut merged: Vec<BlockRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            // end + 1 cannot overflow here: a previous range ending at
            // u64::MAX would have absorbed every later start.
            Some(last) if range.start() <= last.end().saturating_add(1) => {
                if range.end() > last.end() {
                    *last = BlockRange::new_unchecked(last.start(), range.end());
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// The sub-ranges of `request` not covered by any range in `covered`.
///
/// The result is sorted, disjoint, and together with the covered portions
/// partitions `request` exactly. An empty result means the request can be
/// served entirely from the cache.
pub fn uncovered_ranges(request: BlockRange, covered: &[BlockRange]) -> Vec<BlockRange> {
    let relevant: Vec<BlockRange> =
        covered.iter().filter_map(|range| range.intersect(&request)).collect();
    let merged = merge_ranges(relevant);

    let mut gaps = Vec::new();
    let mut cursor = request.start();
    for range in merged {
        if range.start() > cursor {
            gaps.push(BlockRange::new_unchecked(cursor, range.start() - 1));
        }
        match range.end().checked_add(1) {
            Some(next) => cursor = next,
            None => return gaps,
        }
        if cursor > request.end() {
            return gaps;
        }
    }
    gaps.push(BlockRange::new_unchecked(cursor, request.end()));
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, end: u64) -> BlockRange {
        BlockRange::new(start, end).unwrap()
    }

    #[test]
    fn merges_overlapping_and_adjacent_ranges() {
        let merged =
            merge_ranges(vec![range(150, 200), range(100, 149), range(120, 160), range(300, 310)]);
        assert_eq!(merged, vec![range(100, 200), range(300, 310)]);
    }

    #[test]
    fn merge_keeps_disjoint_ranges_apart() {
        let merged = merge_ranges(vec![range(10, 20), range(22, 30)]);
        assert_eq!(merged, vec![range(10, 20), range(22, 30)]);
    }

    #[test]
    fn merge_of_nothing_is_nothing() {
        assert_eq!(merge_ranges(Vec::new()), Vec::new());
    }

    #[test]
    fn uncovered_of_a_cold_cache_is_the_request() {
        assert_eq!(uncovered_ranges(range(100, 200), &[]), vec![range(100, 200)]);
    }

    #[test]
    fn uncovered_of_a_fully_covered_request_is_empty() {
        assert!(uncovered_ranges(range(120, 180), &[range(100, 200)]).is_empty());
        assert!(uncovered_ranges(range(120, 180), &[range(120, 150), range(151, 180)]).is_empty());
    }

    #[test]
    fn partial_overlap_leaves_only_the_tail() {
        let gaps = uncovered_ranges(range(120, 180), &[range(100, 150)]);
        assert_eq!(gaps, vec![range(151, 180)]);
    }

    #[test]
    fn hole_in_the_middle_is_reported_exactly() {
        let gaps = uncovered_ranges(range(0, 100), &[range(0, 30), range(61, 100)]);
        assert_eq!(gaps, vec![range(31, 60)]);
    }

    #[test]
    fn coverage_outside_the_request_is_ignored() {
        let gaps = uncovered_ranges(range(50, 60), &[range(0, 10), range(90, 100)]);
        assert_eq!(gaps, vec![range(50, 60)]);
    }

    #[test]
    fn gaps_at_both_ends() {
        let gaps = uncovered_ranges(range(0, 100), &[range(40, 50)]);
        assert_eq!(gaps, vec![range(0, 39), range(51, 100)]);
    }
}

//! A filter paired with the block range it was (or will be) fetched over.

use crate::{BlockRange, EventFilter, QueryKind};

/// A fully-specified retrieval: which events, over which blocks.
///
/// Queries are what the ledger records. A stored query asserts that every
/// event matching `filter` within `range` is present in the event store, so
/// a later request covered by a stored query can be answered without
/// touching the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventQuery {
    /// The constraints applied to the fetch.
    pub filter: EventFilter,
    /// The inclusive block range the fetch spanned.
    pub range: BlockRange,
}

impl EventQuery {
    /// Pairs a filter with a block range.
    pub const fn new(filter: EventFilter, range: BlockRange) -> Self {
        Self { filter, range }
    }

    /// The kind classifying this query's filter.
    ///
    /// Derived from the filter on every call, so it can never disagree with
    /// the constraints actually applied.
    pub const fn kind(&self) -> QueryKind {
        self.filter.kind()
    }

    /// Whether this query makes `other` redundant: identical constraints
    /// over an enclosing block range.
    pub fn covers(&self, other: &Self) -> bool {
        self.filter == other.filter && self.range.covers(&other.range)
    }
}

impl core::fmt::Display for EventQuery {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "query(kind={}, blocks={})", self.kind(), self.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn coverage_requires_equal_filters() {
        let filter =
            EventFilter::new().with_address(address!("00000000000000000000000000000000000000aa"));
        let wide = EventQuery::new(filter, BlockRange::new(0, 100).unwrap());
        let narrow = EventQuery::new(filter, BlockRange::new(10, 20).unwrap());
        let other = EventQuery::new(EventFilter::new(), BlockRange::new(10, 20).unwrap());

        assert!(wide.covers(&narrow));
        assert!(!narrow.covers(&wide));
        assert!(!wide.covers(&other));
    }
}

//! Selection types describing what to read from the store.

use almanac_types::{BlockRange, EventFilter, EventQuery};
use derive_more::Display;

/// Which events to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventSelection {
    /// Constraints on the events themselves.
    pub filter: EventFilter,
    /// Restricts results to a block range. `None` spans the whole table.
    pub range: Option<BlockRange>,
}

impl EventSelection {
    /// Selects events matching `filter` within `range`.
    pub const fn new(filter: EventFilter, range: BlockRange) -> Self {
        Self { filter, range: Some(range) }
    }

    /// Selects every event matching `filter`, at any height.
    pub const fn all_blocks(filter: EventFilter) -> Self {
        Self { filter, range: None }
    }
}

/// How a ledger lookup compares its block range against stored entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum BoundMode {
    /// Match entries sharing at least one block with the requested range.
    #[default]
    #[display("overlap")]
    Overlap,
    /// Match entries whose recorded range equals the requested range.
    #[display("exact")]
    Exact,
}

/// Which coverage ledger entries to read or delete.
///
/// With a filter, ledger entries match only when they constrained exactly
/// the fields the selection's filter constrains, with the same values. A
/// broader or narrower filter is a different query and proves nothing
/// about this one. Without a filter every entry matches, whatever fields
/// it constrained; listing surfaces use that form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSelection {
    /// The filter whose recorded fetches are of interest. `None` matches
    /// entries of every kind.
    pub filter: Option<EventFilter>,
    /// Restricts matches by block range. `None` matches any range.
    pub range: Option<BlockRange>,
    /// How `range` is compared against stored entries.
    pub bounds: BoundMode,
}

impl LedgerSelection {
    /// Entries for `filter` overlapping `range`.
    pub const fn overlapping(filter: EventFilter, range: BlockRange) -> Self {
        Self { filter: Some(filter), range: Some(range), bounds: BoundMode::Overlap }
    }

    /// Entries for `filter` recorded over exactly `range`.
    pub const fn exact(filter: EventFilter, range: BlockRange) -> Self {
        Self { filter: Some(filter), range: Some(range), bounds: BoundMode::Exact }
    }

    /// Every entry recorded for `filter`.
    pub const fn all_ranges(filter: EventFilter) -> Self {
        Self { filter: Some(filter), range: None, bounds: BoundMode::Overlap }
    }

    /// Every entry, whatever fields it constrained.
    pub const fn any() -> Self {
        Self { filter: None, range: None, bounds: BoundMode::Overlap }
    }

    /// Entries of any kind overlapping `range`.
    pub const fn any_overlapping(range: BlockRange) -> Self {
        Self { filter: None, range: Some(range), bounds: BoundMode::Overlap }
    }
}

/// A coverage ledger entry together with its row identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredEventQuery {
    /// The ledger row identifier, usable with delete operations.
    pub id: i64,
    /// The recorded query.
    pub query: EventQuery,
}

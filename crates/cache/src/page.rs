//! The answer to an event request.

use crate::abi::DecodedEvent;
use almanac_types::{BlockRange, EncodedEvent};
use std::collections::BTreeMap;

/// An ordered page of events with everything a caller asked to attach.
///
/// When decoding was requested, `decoded` is index-parallel with `events`.
/// The counters record where each row came from, so callers can observe
/// how the cache split the work.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    /// The resolved block range this page answers.
    pub range: BlockRange,
    /// Matching events, ascending by block, transaction and log position.
    pub events: Vec<EncodedEvent>,
    /// Decoded rows, present when decoding was requested.
    pub decoded: Option<Vec<DecodedEvent>>,
    /// Timestamps for every block carrying a row, present on request.
    pub timestamps: Option<BTreeMap<u64, u64>>,
    /// Rows served from the local store.
    pub from_store: usize,
    /// Rows fetched from the node.
    pub from_node: usize,
    /// Rows written to the store by this call.
    pub persisted: usize,
}

impl EventPage {
    /// Whether the page carries no rows.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of rows in the page.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Rows grouped under their block number, ascending.
    pub fn by_block(&self) -> BTreeMap<u64, Vec<&EncodedEvent>> {
        let mut blocks: BTreeMap<u64, Vec<&EncodedEvent>> = BTreeMap::new();
        for event in &self.events {
            blocks.entry(event.block_number).or_default().push(event);
        }
        blocks
    }

    /// The timestamp attached for `block`, if any.
    pub fn timestamp_of(&self, block: u64) -> Option<u64> {
        self.timestamps.as_ref()?.get(&block).copied()
    }
}

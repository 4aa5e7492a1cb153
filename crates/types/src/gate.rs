//! The confirmation gate that keeps reorg-prone blocks out of the cache.

use crate::{EncodedEvent, EventQuery};

/// The result of gating a fetched batch against the confirmed chain head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatedBatch {
    /// Events that survived the gate, still in canonical order.
    pub events: Vec<EncodedEvent>,
    /// The query as it may be recorded in the ledger. `None` when nothing
    /// about the fetch is safe to remember.
    pub query: Option<EventQuery>,
}

impl GatedBatch {
    const fn rejected() -> Self {
        Self { events: Vec::new(), query: None }
    }
}

/// The highest block height considered immune to reorgs.
///
/// Returns `None` when the chain is younger than the required confirmation
/// depth.
pub const fn confirmed_head(latest_block: u64, required_confirmations: u64) -> Option<u64> {
    latest_block.checked_sub(required_confirmations)
}

/// Trims a fetched batch down to its reorg-safe prefix.
///
/// Events above the confirmed head are discarded and the recorded query
/// range is shortened to match, so the ledger never claims coverage of
/// blocks that may still change. A query lying entirely above the head is
/// rejected outright.
pub fn gate_batch(
    mut events: Vec<EncodedEvent>,
    query: EventQuery,
    latest_block: u64,
    required_confirmations: u64,
) -> GatedBatch {
    let Some(head) = confirmed_head(latest_block, required_confirmations) else {
        return GatedBatch::rejected();
    };
    let Some(range) = query.range.clamp_end(head) else {
        return GatedBatch::rejected();
    };

    if range != query.range {
        events.retain(|event| event.block_number <= head);
    }
    GatedBatch { events, query: Some(EventQuery::new(query.filter, range)) }
}

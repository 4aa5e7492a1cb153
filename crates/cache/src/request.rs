//! Event requests as callers phrase them.

use almanac_types::{BlockRef, EventFilter};
use alloy_primitives::B256;

/// How a request names the event it is interested in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EventSpec {
    /// A human-readable signature such as
    /// `Transfer(address indexed from, address indexed to, uint256 value)`.
    /// Pins topic0 to the signature's selector and enables decoded output.
    Signature(String),
    /// A raw topic0 hash. Pins topic0 without any decoding ability.
    Hash(B256),
    /// No event constraint beyond the raw topic filter.
    #[default]
    None,
}

/// One question put to the scribe: which events, over which blocks, and
/// what to attach to the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRequest {
    /// Raw constraints on the emitting contract and topics.
    pub filter: EventFilter,
    /// The event of interest, by signature or hash.
    pub event: EventSpec,
    /// First block of interest.
    pub start: BlockRef,
    /// Last block of interest.
    pub end: BlockRef,
    /// Decode each row against the signature into named parameters.
    pub decode: bool,
    /// Attach block timestamps for every block that carries a row.
    pub timestamps: bool,
}

impl EventRequest {
    /// An unconstrained request spanning `start` through `end`.
    pub fn new(start: impl Into<BlockRef>, end: impl Into<BlockRef>) -> Self {
        Self {
            filter: EventFilter::new(),
            event: EventSpec::None,
            start: start.into(),
            end: end.into(),
            decode: false,
            timestamps: false,
        }
    }

    /// Replaces the raw filter.
    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Names the event by signature, enabling decoded output.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.event = EventSpec::Signature(signature.into());
        self
    }

    /// Names the event by its topic0 hash.
    pub fn with_event_hash(mut self, hash: B256) -> Self {
        self.event = EventSpec::Hash(hash);
        self
    }

    /// Asks for decoded rows alongside the raw ones.
    pub fn decoded(mut self) -> Self {
        self.decode = true;
        self
    }

    /// Asks for block timestamps alongside the rows.
    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }
}

//! Event filters and the query-kind bitmask that classifies them.

use crate::EncodedEvent;
use alloy_primitives::{Address, B256};

/// The set of constraints a fetch or cache lookup applies to event logs.
///
/// Every field is optional. An unset field matches any value, so the default
/// filter matches every event in a block range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventFilter {
    /// Emitting contract to match, if constrained.
    pub contract_address: Option<Address>,
    /// Topic constraints by position. Index zero is the event signature hash.
    pub topics: [Option<B256>; 4],
}

impl EventFilter {
    /// A filter with no constraints.
    pub const fn new() -> Self {
        Self { contract_address: None, topics: [None; 4] }
    }

    /// Constrains the filter to one emitting contract.
    pub const fn with_address(mut self, address: Address) -> Self {
        self.contract_address = Some(address);
        self
    }

    /// Constrains the filter to one event signature hash.
    pub const fn with_event(mut self, event_hash: B256) -> Self {
        self.topics[0] = Some(event_hash);
        self
    }

    /// Constrains an indexed topic position. `position` is 1 through 3.
    ///
    /// # Panics
    ///
    /// Panics if `position` is 0 (use [`with_event`](Self::with_event)) or
    /// greater than 3.
    pub const fn with_topic(mut self, position: usize, value: B256) -> Self {
        assert!(position >= 1 && position <= 3, "indexed topic position must be 1 through 3");
        self.topics[position] = Some(value);
        self
    }

    /// The event signature constraint, if any.
    pub const fn event_hash(&self) -> Option<B256> {
        self.topics[0]
    }

    /// Whether the filter constrains nothing.
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::new()
    }

    /// The bitmask classifying which fields this filter constrains.
    pub const fn kind(&self) -> QueryKind {
        let mut bits = 0u8;
        if self.contract_address.is_some() {
            bits |= QueryKind::ADDRESS.0;
        }
        let mut i = 0;
        while i < 4 {
            if self.topics[i].is_some() {
                bits |= 1 << (i + 1);
            }
            i += 1;
        }
        QueryKind(bits)
    }

    /// Whether `event` satisfies every constraint of the filter.
    pub fn matches(&self, event: &EncodedEvent) -> bool {
        if self.contract_address.is_some_and(|a| a != event.contract_address) {
            return false;
        }
        let topics = [Some(event.event_hash), event.topic1, event.topic2, event.topic3];
        self.topics.iter().zip(topics).all(|(want, got)| match want {
            Some(want) => got == Some(*want),
            None => true,
        })
    }
}

/// A bitmask recording which filter fields a cached query constrained.
///
/// Two queries cover each other only when they constrain the same fields
/// with the same values. The mask makes the first half of that check a
/// single integer comparison and gives the ledger a compact column to
/// index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKind(u8);

impl QueryKind {
    /// The contract address is constrained.
    pub const ADDRESS: Self = Self(1);
    /// The event signature hash is constrained.
    pub const TOPIC0: Self = Self(1 << 1);
    /// The first indexed topic is constrained.
    pub const TOPIC1: Self = Self(1 << 2);
    /// The second indexed topic is constrained.
    pub const TOPIC2: Self = Self(1 << 3);
    /// The third indexed topic is constrained.
    pub const TOPIC3: Self = Self(1 << 4);

    const MASK: u8 = 0b1_1111;

    /// The kind of an unconstrained query.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Whether no field is constrained.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether every field constrained in `other` is also constrained here.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// The raw bit representation, as persisted in the query ledger.
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Reconstructs a kind from its persisted bits, rejecting unknown ones.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::MASK != 0 {
            return None;
        }
        Some(Self(bits))
    }
}

impl core::ops::BitOr for QueryKind {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, bytes};

    const ADDR: Address = address!("00000000000000000000000000000000000000aa");
    const SIG: B256 = b256!("dddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddd");
    const TOPIC: B256 = b256!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

    fn event() -> EncodedEvent {
        EncodedEvent {
            block_number: 10,
            transaction_index: 0,
            log_index: 0,
            transaction_hash: B256::ZERO,
            contract_address: ADDR,
            event_hash: SIG,
            topic1: Some(TOPIC),
            topic2: None,
            topic3: None,
            unindexed: bytes!("00"),
        }
    }

    #[test]
    fn kind_reflects_constrained_fields() {
        assert_eq!(EventFilter::new().kind(), QueryKind::empty());
        assert_eq!(EventFilter::new().with_address(ADDR).kind(), QueryKind::ADDRESS);
        assert_eq!(
            EventFilter::new().with_address(ADDR).with_event(SIG).kind(),
            QueryKind::ADDRESS | QueryKind::TOPIC0,
        );
        assert_eq!(
            EventFilter::new().with_topic(2, TOPIC).kind().bits(),
            QueryKind::TOPIC2.bits(),
        );
    }

    #[test]
    fn kind_bits_round_trip() {
        let kind = QueryKind::ADDRESS | QueryKind::TOPIC0 | QueryKind::TOPIC3;
        assert_eq!(QueryKind::from_bits(kind.bits()), Some(kind));
        assert_eq!(QueryKind::from_bits(0b10_0000), None);
        assert!(kind.contains(QueryKind::TOPIC0));
        assert!(!kind.contains(QueryKind::TOPIC1));
    }

    #[test]
    fn unconstrained_filter_matches_everything() {
        assert!(EventFilter::new().matches(&event()));
        assert!(EventFilter::new().is_unconstrained());
    }

    #[test]
    fn address_and_topic_constraints_must_all_hold() {
        let matching = EventFilter::new().with_address(ADDR).with_event(SIG).with_topic(1, TOPIC);
        assert!(matching.matches(&event()));

        let wrong_address = EventFilter::new()
            .with_address(address!("00000000000000000000000000000000000000bb"));
        assert!(!wrong_address.matches(&event()));

        // A constraint on an absent topic never matches.
        let absent_topic = EventFilter::new().with_topic(3, TOPIC);
        assert!(!absent_topic.matches(&event()));
    }
}

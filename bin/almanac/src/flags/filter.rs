//! Event filter flags.

use almanac_cache::EventSpec;
use almanac_types::{BinaryValue, EventFilter};
use alloy_primitives::{Address, B256, U256};
use clap::Parser;

/// Constraints on which events match.
///
/// Every flag is optional; an absent flag matches anything. `--event` and
/// `--event-hash` both pin the signature topic, so only one may be given.
#[derive(Parser, Default, Clone, Debug)]
pub struct FilterArgs {
    /// The emitting contract.
    #[arg(
        long,
        visible_alias = "contract",
        value_parser = parse_address,
        help = "Contract address, hex with or without the 0x prefix"
    )]
    pub address: Option<Address>,
    /// The full event signature. Pins topic0 and enables `--decode`.
    #[arg(
        long,
        visible_alias = "signature",
        conflicts_with = "event_hash",
        help = "Event signature, e.g. 'Transfer(address indexed from, address indexed to, uint256 value)'"
    )]
    pub event: Option<String>,
    /// The event signature hash, for when the full signature is not known.
    #[arg(long, value_parser = parse_topic, help = "Event signature hash (topic0)")]
    pub event_hash: Option<B256>,
    /// First indexed topic.
    #[arg(
        long,
        value_parser = parse_topic,
        help = "First indexed topic: 0x-prefixed hex, or a decimal integer"
    )]
    pub topic1: Option<B256>,
    /// Second indexed topic.
    #[arg(long, value_parser = parse_topic, help = "Second indexed topic")]
    pub topic2: Option<B256>,
    /// Third indexed topic.
    #[arg(long, value_parser = parse_topic, help = "Third indexed topic")]
    pub topic3: Option<B256>,
}

impl FilterArgs {
    /// The raw topic and address filter these flags describe.
    ///
    /// Signature flags are left out; the cache resolves those itself so it
    /// can also use them for decoding.
    pub fn filter(&self) -> EventFilter {
        let mut filter = EventFilter::new();
        if let Some(address) = self.address {
            filter = filter.with_address(address);
        }
        if let Some(topic) = self.topic1 {
            filter = filter.with_topic(1, topic);
        }
        if let Some(topic) = self.topic2 {
            filter = filter.with_topic(2, topic);
        }
        if let Some(topic) = self.topic3 {
            filter = filter.with_topic(3, topic);
        }
        filter
    }

    /// How the request names its event.
    pub fn event_spec(&self) -> EventSpec {
        match (&self.event, self.event_hash) {
            (Some(signature), _) => EventSpec::Signature(signature.clone()),
            (None, Some(hash)) => EventSpec::Hash(hash),
            (None, None) => EventSpec::None,
        }
    }

    /// The filter with any event signature or hash resolved onto topic0,
    /// for store lookups that never go through the cache.
    pub fn resolved_filter(&self) -> anyhow::Result<EventFilter> {
        let filter = self.filter();
        match (&self.event, self.event_hash) {
            (Some(signature), _) => {
                let event = alloy_json_abi::Event::parse(signature)
                    .map_err(|err| anyhow::anyhow!("cannot parse event signature: {err}"))?;
                Ok(filter.with_event(event.selector()))
            }
            (None, Some(hash)) => Ok(filter.with_event(hash)),
            (None, None) => Ok(filter),
        }
    }
}

/// Parses a contract address, left-padding short values to 20 bytes.
fn parse_address(raw: &str) -> anyhow::Result<Address> {
    Ok(BinaryValue::from_hex(raw)?.to_address()?)
}

/// Parses a topic word. Decimal digits read as an integer; anything else
/// reads as hex. Short values are left-padded to the 32-byte topic width.
fn parse_topic(raw: &str) -> anyhow::Result<B256> {
    if raw.is_empty() {
        anyhow::bail!("empty topic value");
    }
    let value = if raw.bytes().all(|byte| byte.is_ascii_digit()) {
        BinaryValue::from_uint(raw.parse::<U256>()?)
    } else {
        BinaryValue::from_hex(raw)?
    };
    Ok(value.to_b256()?)
}

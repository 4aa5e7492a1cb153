//! Event-signature resolution and row decoding.

use crate::{error::ScribeError, request::EventSpec};
use almanac_types::{EncodedEvent, EventFilter};
use alloy_dyn_abi::{DynSolValue, EventExt};
use alloy_json_abi::Event;
use alloy_primitives::B256;

/// A stored event decoded against its declared signature.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    /// The event's declared name.
    pub name: String,
    /// Parameter names and values, in declaration order.
    pub params: Vec<(String, DynSolValue)>,
}

/// Resolves the requested event against the raw topic filter.
///
/// A signature parses into an [`Event`] and pins topic0 to its selector; a
/// bare hash pins topic0 without decoding ability. A topic0 already present
/// in the filter must agree with the resolved value.
pub(crate) fn resolve_spec(
    spec: &EventSpec,
    filter: EventFilter,
) -> Result<(EventFilter, Option<Event>), ScribeError> {
    match spec {
        EventSpec::Signature(signature) => {
            let event = Event::parse(signature)
                .map_err(|error| ScribeError::AbiResolution(error.to_string()))?;
            let filter = pin_topic0(filter, event.selector())?;
            Ok((filter, Some(event)))
        }
        EventSpec::Hash(hash) => Ok((pin_topic0(filter, *hash)?, None)),
        EventSpec::None => Ok((filter, None)),
    }
}

fn pin_topic0(filter: EventFilter, selector: B256) -> Result<EventFilter, ScribeError> {
    match filter.event_hash() {
        Some(existing) if existing != selector => {
            Err(ScribeError::InconsistentFilter { expected: selector, got: existing })
        }
        _ => Ok(filter.with_event(selector)),
    }
}

/// Decodes one stored row against `event`, pairing parameter names with
/// their values in declaration order.
pub(crate) fn decode_event(event: &Event, row: &EncodedEvent) -> Result<DecodedEvent, ScribeError> {
    let raw = event.decode_log_parts(row.topics(), &row.unindexed)?;

    // decode_log_parts checked both arities, so every input pairs with
    // exactly one decoded value.
    let mut indexed = raw.indexed.into_iter();
    let mut body = raw.body.into_iter();
    let params = event
        .inputs
        .iter()
        .filter_map(|input| {
            let value = if input.indexed { indexed.next() } else { body.next() }?;
            Some((input.name.clone(), value))
        })
        .collect();

    Ok(DecodedEvent { name: event.name.clone(), params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, Bytes, U256, b256};

    const TRANSFER_SIG: &str = "Transfer(address indexed from, address indexed to, uint256 value)";
    const TRANSFER_SELECTOR: B256 =
        b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

    fn transfer_row(from: Address, to: Address, value: u64) -> EncodedEvent {
        EncodedEvent {
            block_number: 100,
            transaction_index: 0,
            log_index: 0,
            transaction_hash: B256::repeat_byte(0x7f),
            contract_address: Address::repeat_byte(0xaa),
            event_hash: TRANSFER_SELECTOR,
            topic1: Some(B256::left_padding_from(from.as_slice())),
            topic2: Some(B256::left_padding_from(to.as_slice())),
            topic3: None,
            unindexed: Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec()),
        }
    }

    #[test]
    fn signature_resolution_pins_the_selector() {
        let spec = EventSpec::Signature(TRANSFER_SIG.to_string());
        let (filter, event) = resolve_spec(&spec, EventFilter::new()).unwrap();
        assert_eq!(filter.event_hash(), Some(TRANSFER_SELECTOR));
        assert_eq!(event.unwrap().name, "Transfer");
    }

    #[test]
    fn hash_resolution_pins_without_an_abi() {
        let hash = B256::repeat_byte(0x42);
        let (filter, event) = resolve_spec(&EventSpec::Hash(hash), EventFilter::new()).unwrap();
        assert_eq!(filter.event_hash(), Some(hash));
        assert!(event.is_none());
    }

    #[test]
    fn matching_explicit_topic0_is_accepted() {
        let spec = EventSpec::Signature(TRANSFER_SIG.to_string());
        let preset = EventFilter::new().with_event(TRANSFER_SELECTOR);
        let (filter, _) = resolve_spec(&spec, preset).unwrap();
        assert_eq!(filter.event_hash(), Some(TRANSFER_SELECTOR));
    }

    #[test]
    fn contradictory_topic0_is_rejected() {
        let spec = EventSpec::Signature(TRANSFER_SIG.to_string());
        let preset = EventFilter::new().with_event(B256::repeat_byte(0x99));
        let result = resolve_spec(&spec, preset);
        assert!(matches!(
            result,
            Err(ScribeError::InconsistentFilter { expected, got })
                if expected == TRANSFER_SELECTOR && got == B256::repeat_byte(0x99)
        ));
    }

    #[test]
    fn unparseable_signatures_are_rejected() {
        let spec = EventSpec::Signature("Transfer(address".to_string());
        assert!(matches!(
            resolve_spec(&spec, EventFilter::new()),
            Err(ScribeError::AbiResolution(_))
        ));
    }

    #[test]
    fn decoding_pairs_names_and_values_in_declaration_order() {
        let event = Event::parse(TRANSFER_SIG).unwrap();
        let from = Address::repeat_byte(0x11);
        let to = Address::repeat_byte(0x22);

        let decoded = decode_event(&event, &transfer_row(from, to, 1_000)).unwrap();
        assert_eq!(decoded.name, "Transfer");
        assert_eq!(
            decoded.params,
            vec![
                ("from".to_string(), DynSolValue::Address(from)),
                ("to".to_string(), DynSolValue::Address(to)),
                ("value".to_string(), DynSolValue::Uint(U256::from(1_000), 256)),
            ],
        );
    }

    #[test]
    fn rows_with_the_wrong_shape_fail_to_decode() {
        let event = Event::parse(TRANSFER_SIG).unwrap();
        let mut row = transfer_row(Address::repeat_byte(0x11), Address::repeat_byte(0x22), 5);
        row.topic2 = None;

        assert!(matches!(decode_event(&event, &row), Err(ScribeError::Decode(_))));
    }
}

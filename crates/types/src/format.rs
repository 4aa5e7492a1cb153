//! Presentation of stored events: binary value handling, column selection
//! and row rendering.
//!
//! Callers hand the cache addresses and topics in whatever shape they have
//! them (raw bytes, hex literals, integers). [`BinaryValue`] normalizes all
//! of those to canonical bytes once, at the edge, with total conversions in
//! both directions. The row types turn an [`EncodedEvent`] into output
//! without the consumer touching byte layout.

use crate::EncodedEvent;
use alloy_primitives::{Address, B256, Bytes, FixedBytes, U256, hex};
use serde::Serialize;
use thiserror::Error;

/// A binary value in its canonical form: plain bytes.
///
/// Constructors accept each accepted input representation explicitly, so
/// there is exactly one place where representations meet and no value-shape
/// sniffing anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryValue(Bytes);

impl BinaryValue {
    /// Wraps raw bytes unchanged.
    pub fn from_raw(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Parses a hex literal, with or without a `0x` prefix.
    pub fn from_hex(literal: &str) -> Result<Self, FormatError> {
        Ok(Self(hex::decode(literal)?.into()))
    }

    /// Encodes an unsigned integer as its shortest big-endian byte string.
    ///
    /// Zero encodes as a single zero byte rather than an empty string.
    pub fn from_uint(value: U256) -> Self {
        if value.is_zero() {
            return Self(Bytes::from(vec![0u8]));
        }
        Self(value.to_be_bytes_trimmed_vec().into())
    }

    /// The canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the value, yielding its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Renders the value as a `0x`-prefixed lowercase hex string.
    pub fn to_prefix_hex(&self) -> String {
        hex::encode_prefixed(&self.0)
    }

    /// Left-pads the value to a 32-byte word, as topics are encoded.
    ///
    /// Fails when the value is longer than 32 bytes.
    pub fn to_b256(&self) -> Result<B256, FormatError> {
        if self.0.len() > 32 {
            return Err(FormatError::Width { len: self.0.len(), width: 32 });
        }
        Ok(B256::left_padding_from(&self.0))
    }

    /// Left-pads the value to a 20-byte address.
    ///
    /// Fails when the value is longer than 20 bytes.
    pub fn to_address(&self) -> Result<Address, FormatError> {
        if self.0.len() > 20 {
            return Err(FormatError::Width { len: self.0.len(), width: 20 });
        }
        Ok(Address::from(FixedBytes::<20>::left_padding_from(&self.0)))
    }
}

impl core::fmt::Display for BinaryValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_prefix_hex())
    }
}

impl From<B256> for BinaryValue {
    fn from(value: B256) -> Self {
        Self::from_raw(value.to_vec())
    }
}

impl From<Address> for BinaryValue {
    fn from(value: Address) -> Self {
        Self::from_raw(value.to_vec())
    }
}

/// How binary columns are rendered in output rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BinaryFormat {
    /// Pass the bytes through untouched.
    Raw,
    /// Render as a `0x`-prefixed lowercase hex string.
    #[default]
    PrefixHex,
}

/// Errors converting between binary representations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The input was not valid hex.
    #[error("invalid hex literal: {0}")]
    Hex(#[from] hex::FromHexError),
    /// The value does not fit the requested fixed width.
    #[error("value of {len} bytes does not fit a {width}-byte field")]
    Width {
        /// Length of the value in bytes.
        len: usize,
        /// Width of the target field in bytes.
        width: usize,
    },
    /// An output column name was not recognized.
    #[error("unknown event column `{0}`")]
    UnknownColumn(String),
}

/// The columns an [`EncodedEvent`] can be projected onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventColumn {
    /// Height of the containing block.
    BlockNumber,
    /// Index of the emitting transaction within its block.
    TransactionIndex,
    /// Index of the event within its block.
    LogIndex,
    /// Hash of the emitting transaction.
    TransactionHash,
    /// The emitting contract.
    ContractAddress,
    /// The event signature hash.
    EventHash,
    /// First indexed argument.
    Topic1,
    /// Second indexed argument.
    Topic2,
    /// Third indexed argument.
    Topic3,
    /// ABI-encoded unindexed arguments.
    Unindexed,
}

impl EventColumn {
    /// Every column, in canonical output order.
    pub const ALL: [Self; 10] = [
        Self::BlockNumber,
        Self::TransactionIndex,
        Self::LogIndex,
        Self::TransactionHash,
        Self::ContractAddress,
        Self::EventHash,
        Self::Topic1,
        Self::Topic2,
        Self::Topic3,
        Self::Unindexed,
    ];

    /// The snake_case name used in column selections and headers.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BlockNumber => "block_number",
            Self::TransactionIndex => "transaction_index",
            Self::LogIndex => "log_index",
            Self::TransactionHash => "transaction_hash",
            Self::ContractAddress => "contract_address",
            Self::EventHash => "event_hash",
            Self::Topic1 => "topic1",
            Self::Topic2 => "topic2",
            Self::Topic3 => "topic3",
            Self::Unindexed => "unindexed",
        }
    }
}

impl core::str::FromStr for EventColumn {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|column| column.name() == s)
            .ok_or_else(|| FormatError::UnknownColumn(s.to_string()))
    }
}

impl core::fmt::Display for EventColumn {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell of a rendered event row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    /// An integer column.
    Integer(u64),
    /// A binary column rendered as raw bytes.
    Bytes(Bytes),
    /// A binary column rendered as prefixed hex.
    Hex(String),
    /// An absent optional column.
    Null,
}

impl core::fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Bytes(bytes) => write!(f, "{bytes}"),
            Self::Hex(hex) => f.write_str(hex),
            Self::Null => Ok(()),
        }
    }
}

/// One rendered event, as column and cell pairs in selection order.
pub type EventRow = Vec<(EventColumn, ColumnValue)>;

/// Controls which columns an event row carries and how binary cells render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFormat {
    /// The columns to emit, in order. `None` selects every column.
    pub columns: Option<Vec<EventColumn>>,
    /// Rendering of non-topic binary cells.
    pub binary: BinaryFormat,
    /// Rendering of the signature hash and indexed topic cells.
    pub topics: BinaryFormat,
}

impl RowFormat {
    /// The columns this format selects, in output order.
    pub fn columns(&self) -> &[EventColumn] {
        self.columns.as_deref().unwrap_or(&EventColumn::ALL)
    }
}

fn render(bytes: &[u8], format: BinaryFormat) -> ColumnValue {
    match format {
        BinaryFormat::Raw => ColumnValue::Bytes(Bytes::copy_from_slice(bytes)),
        BinaryFormat::PrefixHex => ColumnValue::Hex(hex::encode_prefixed(bytes)),
    }
}

fn render_topic(topic: Option<B256>, format: BinaryFormat) -> ColumnValue {
    match topic {
        Some(topic) => render(topic.as_slice(), format),
        None => ColumnValue::Null,
    }
}

impl EncodedEvent {
    /// Projects the event onto the columns `format` selects.
    pub fn to_row(&self, format: &RowFormat) -> EventRow {
        format
            .columns()
            .iter()
            .map(|&column| {
                let value = match column {
                    EventColumn::BlockNumber => ColumnValue::Integer(self.block_number),
                    EventColumn::TransactionIndex => ColumnValue::Integer(self.transaction_index),
                    EventColumn::LogIndex => ColumnValue::Integer(self.log_index),
                    EventColumn::TransactionHash => {
                        render(self.transaction_hash.as_slice(), format.binary)
                    }
                    EventColumn::ContractAddress => {
                        render(self.contract_address.as_slice(), format.binary)
                    }
                    EventColumn::EventHash => render(self.event_hash.as_slice(), format.topics),
                    EventColumn::Topic1 => render_topic(self.topic1, format.topics),
                    EventColumn::Topic2 => render_topic(self.topic2, format.topics),
                    EventColumn::Topic3 => render_topic(self.topic3, format.topics),
                    EventColumn::Unindexed => render(&self.unindexed, format.binary),
                };
                (column, value)
            })
            .collect()
    }
}

//! The canonical stored representation of an Ethereum event log.

use alloy_primitives::{Address, B256, Bytes};
use alloy_rpc_types_eth::Log;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single emitted event, normalized into the shape the cache stores.
///
/// Each event keeps the raw ABI-encoded pieces of the log: the event
/// signature hash, up to three indexed topics, and the unindexed data blob.
/// Decoding against an ABI happens later, at presentation time, so the cache
/// never loses information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedEvent {
    /// Height of the block containing the event.
    pub block_number: u64,
    /// Position of the emitting transaction within its block.
    pub transaction_index: u64,
    /// Position of the event within its block. Together with
    /// [`block_number`](Self::block_number) this uniquely identifies an event.
    pub log_index: u64,
    /// Hash of the emitting transaction.
    pub transaction_hash: B256,
    /// Contract that emitted the event.
    pub contract_address: Address,
    /// Keccak-256 hash of the event signature, also known as topic zero.
    pub event_hash: B256,
    /// First indexed argument, if the event declares one.
    pub topic1: Option<B256>,
    /// Second indexed argument, if the event declares one.
    pub topic2: Option<B256>,
    /// Third indexed argument, if the event declares one.
    pub topic3: Option<B256>,
    /// ABI-encoded unindexed arguments.
    pub unindexed: Bytes,
}

impl EncodedEvent {
    /// Sort key giving the canonical chain ordering of events.
    pub const fn key(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }

    /// The topic list as it appeared on the wire, signature hash first.
    ///
    /// Trailing unset topics are omitted, so the result has one to four
    /// entries.
    pub fn topics(&self) -> Vec<B256> {
        let mut topics = Vec::with_capacity(4);
        topics.push(self.event_hash);
        for topic in [self.topic1, self.topic2, self.topic3] {
            match topic {
                Some(t) => topics.push(t),
                None => break,
            }
        }
        topics
    }
}

/// Failures normalizing a raw RPC log into an [`EncodedEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EventConversionError {
    /// The node returned a log without a field the cache requires. Logs from
    /// pending blocks lack block and transaction metadata and cannot be
    /// cached.
    #[error("log is missing required field `{0}`")]
    MissingField(&'static str),
}

impl TryFrom<&Log> for EncodedEvent {
    type Error = EventConversionError;

    fn try_from(log: &Log) -> Result<Self, Self::Error> {
        let block_number =
            log.block_number.ok_or(EventConversionError::MissingField("block_number"))?;
        let transaction_index =
            log.transaction_index.ok_or(EventConversionError::MissingField("transaction_index"))?;
        let log_index = log.log_index.ok_or(EventConversionError::MissingField("log_index"))?;
        let transaction_hash =
            log.transaction_hash.ok_or(EventConversionError::MissingField("transaction_hash"))?;

        // Anonymous events carry no signature hash and cannot be keyed.
        let topics = log.inner.data.topics();
        let event_hash =
            topics.first().copied().ok_or(EventConversionError::MissingField("topic0"))?;

        Ok(Self {
            block_number,
            transaction_index,
            log_index,
            transaction_hash,
            contract_address: log.inner.address,
            event_hash,
            topic1: topics.get(1).copied(),
            topic2: topics.get(2).copied(),
            topic3: topics.get(3).copied(),
            unindexed: log.inner.data.data.clone(),
        })
    }
}

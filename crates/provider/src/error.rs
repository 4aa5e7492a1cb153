//! Error types for log retrieval.

use almanac_types::{EventConversionError, RangeError};
use alloy_transport::TransportError;
use thiserror::Error;

/// Failures while retrieving logs or resolving block references.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The RPC transport failed.
    #[error("rpc transport error: {0}")]
    Transport(#[from] TransportError),
    /// The requested range or chunking parameters were invalid.
    #[error(transparent)]
    Range(#[from] RangeError),
    /// A returned log could not be normalized for storage.
    #[error("failed to normalize a returned log: {0}")]
    Conversion(#[from] EventConversionError),
    /// The node has no block at a height it reported as canonical.
    #[error("block {0} not found")]
    BlockNotFound(u64),
    /// Every block on the chain is older than the requested timestamp.
    #[error("chain has no block at or after timestamp {0}")]
    TimestampBeyondHead(u64),
    /// Every block on the chain is newer than the requested timestamp.
    #[error("chain has no block at or before timestamp {0}")]
    TimestampBeforeGenesis(u64),
}

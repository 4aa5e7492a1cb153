//! Error types for cache coordination.

use almanac_provider::FetchError;
use almanac_store::StorageError;
use almanac_types::RangeError;
use alloy_primitives::B256;
use thiserror::Error;

/// Failures while answering an event request.
#[derive(Debug, Error)]
pub enum ScribeError {
    /// Talking to the node failed.
    #[error(transparent)]
    Fetch(FetchError),
    /// The local store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The requested block range is unusable.
    #[error(transparent)]
    Range(#[from] RangeError),
    /// The event signature could not be parsed, or an operation needed a
    /// signature the request does not carry.
    #[error("cannot resolve event abi: {0}")]
    AbiResolution(String),
    /// The request pins topic0 to a value that disagrees with the selector
    /// of its event signature.
    #[error("filter topic0 {got} contradicts the event signature hash {expected}")]
    InconsistentFilter {
        /// The selector derived from the signature.
        expected: B256,
        /// The topic0 supplied alongside it.
        got: B256,
    },
    /// A stored row does not decode against the resolved signature.
    #[error("failed to decode an event against its signature: {0}")]
    Decode(#[from] alloy_dyn_abi::Error),
}

impl From<FetchError> for ScribeError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Range(error) => Self::Range(error),
            error => Self::Fetch(error),
        }
    }
}

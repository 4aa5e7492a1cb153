//! User-facing references to block heights.

use thiserror::Error;

/// A block boundary as a caller names it, before resolution against a node.
///
/// Numbers stand for themselves. `Latest` resolves to the node's current
/// tip and `Timestamp` resolves by searching the chain for the block whose
/// timestamp brackets the given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockRef {
    /// An explicit block height.
    Number(u64),
    /// The current tip of the chain.
    Latest,
    /// The block active at a unix timestamp, written `@<seconds>`.
    Timestamp(u64),
}

impl From<u64> for BlockRef {
    fn from(number: u64) -> Self {
        Self::Number(number)
    }
}

/// The input could not be read as a block reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid block reference `{0}`: expected a block number, `latest`, or `@<unix-timestamp>`")]
pub struct BlockRefParseError(pub String);

impl core::str::FromStr for BlockRef {
    type Err = BlockRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        if let Some(seconds) = raw.strip_prefix('@') {
            return seconds
                .parse::<u64>()
                .map(Self::Timestamp)
                .map_err(|_| BlockRefParseError(s.to_string()));
        }
        if let Some(hex) = raw.strip_prefix("0x") {
            return u64::from_str_radix(hex, 16)
                .map(Self::Number)
                .map_err(|_| BlockRefParseError(s.to_string()));
        }
        raw.parse::<u64>().map(Self::Number).map_err(|_| BlockRefParseError(s.to_string()))
    }
}

impl core::fmt::Display for BlockRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Latest => f.write_str("latest"),
            Self::Timestamp(seconds) => write!(f, "@{seconds}"),
        }
    }
}

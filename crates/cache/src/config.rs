//! Scribe configuration, resolved into typed values at the call boundary.

use almanac_provider::FetchConfig;
use derive_more::Display;

/// Confirmation depth required before fetched rows are persisted.
pub const DEFAULT_REQUIRED_CONFIRMATIONS: u64 = 12;

/// Names the chain a cache belongs to.
///
/// The tag segregates cache files per network and labels log lines. It is
/// never sent to the node; callers are responsible for pairing the right
/// tag with the right RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct NetworkTag(String);

impl NetworkTag {
    /// Tags a network by name, e.g. `mainnet` or `sepolia`.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NetworkTag {
    fn default() -> Self {
        Self::new("mainnet")
    }
}

impl From<&str> for NetworkTag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// How aggressively the scribe uses its local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Serve ledger-covered block ranges from the store instead of the node.
    pub read_cache: bool,
    /// Persist confirmed fetched rows and record their coverage.
    pub write_cache: bool,
    /// Blocks that must sit on top of a row before it is persisted.
    pub required_confirmations: u64,
    /// Tuning for remote fetches.
    pub fetch: FetchConfig,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            read_cache: true,
            write_cache: true,
            required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            fetch: FetchConfig::default(),
        }
    }
}

/// Everything an [`EventScribe`](crate::EventScribe) needs to know up front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScribeConfig {
    /// The network whose events are being cached.
    pub network: NetworkTag,
    /// Cache read/write behavior and fetch tuning.
    pub policy: CachePolicy,
}

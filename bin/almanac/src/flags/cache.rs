//! Cache policy and fetch tuning flags.

use almanac_cache::{CachePolicy, DEFAULT_REQUIRED_CONFIRMATIONS};
use almanac_provider::{
    DEFAULT_MAX_BLOCKS_PER_REQUEST, DEFAULT_MAX_CONCURRENT_REQUESTS, FetchConfig,
};
use clap::Parser;
use std::num::NonZeroU32;

/// How the cache and the node fetcher behave for one invocation.
#[derive(Parser, Clone, Copy, Debug)]
pub struct CacheArgs {
    /// Ignore recorded coverage and fetch the whole range from the node.
    #[arg(long, help = "Skip reading cached spans; fetch everything from the node")]
    pub no_read_cache: bool,
    /// Do not persist fetched rows or record coverage.
    #[arg(long, help = "Skip persisting fetched rows and recording coverage")]
    pub no_write_cache: bool,
    /// Blocks that must sit on top of a row before it is persisted.
    #[arg(
        long,
        default_value_t = DEFAULT_REQUIRED_CONFIRMATIONS,
        help = "Confirmations a block needs before its rows are cached"
    )]
    pub confirmations: u64,
    /// Widest block span a single node request may cover.
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_BLOCKS_PER_REQUEST,
        help = "Widest block span per eth_getLogs request"
    )]
    pub chunk_size: u64,
    /// How many node requests may be in flight at once.
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONCURRENT_REQUESTS,
        help = "Concurrent in-flight node requests"
    )]
    pub concurrency: usize,
    /// Requests-per-second budget shared across in-flight requests.
    #[arg(long, help = "Requests-per-second budget (unlimited when absent)")]
    pub rps: Option<NonZeroU32>,
}

impl CacheArgs {
    /// The typed cache policy these flags describe.
    pub const fn policy(&self) -> CachePolicy {
        CachePolicy {
            read_cache: !self.no_read_cache,
            write_cache: !self.no_write_cache,
            required_confirmations: self.confirmations,
            fetch: FetchConfig {
                max_blocks_per_request: self.chunk_size,
                max_concurrent_requests: self.concurrency,
                requests_per_second: self.rps,
            },
        }
    }
}

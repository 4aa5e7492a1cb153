//! Event-log retrieval from Ethereum nodes.
//!
//! This crate owns every conversation with the node: the [`ChainClient`]
//! abstraction and its HTTP implementation, the chunked concurrent
//! [`LogFetcher`], request pacing, and resolution of block references
//! (numbers, `latest`, timestamps) into concrete heights.

#![doc(issue_tracker_base_url = "https://github.com/almanac-rs/almanac/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod client;
pub use client::{ChainClient, HttpChainClient};

mod error;
pub use error::FetchError;

mod fetcher;
pub use fetcher::{
    DEFAULT_MAX_BLOCKS_PER_REQUEST, DEFAULT_MAX_CONCURRENT_REQUESTS, FetchConfig, LogFetcher,
};

mod metrics;

mod pacer;
pub use pacer::RequestPacer;

mod resolve;
pub use resolve::resolve_range;

mod timestamps;
pub use timestamps::BlockTimestamps;

//! The node abstraction the fetcher and resolver run against.

use crate::FetchError;
use almanac_types::{BlockRange, EventFilter};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::{Filter, Log};
use async_trait::async_trait;
use std::fmt::Debug;
use url::Url;

/// The minimal node surface needed to retrieve event logs.
///
/// Everything above this trait is deterministic given its answers, which is
/// what makes the fetching and caching layers testable without a node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Debug + Send + Sync {
    /// The height of the node's current chain tip.
    async fn latest_block_number(&self) -> Result<u64, FetchError>;

    /// The timestamp of the block at `number`, or `None` if the node does
    /// not have it.
    async fn block_timestamp(&self, number: u64) -> Result<Option<u64>, FetchError>;

    /// Every log matching `filter` within the inclusive `range`, in the
    /// node's canonical order.
    async fn logs(&self, filter: &EventFilter, range: BlockRange) -> Result<Vec<Log>, FetchError>;
}

/// A [`ChainClient`] speaking JSON-RPC over HTTP.
#[derive(Debug, Clone)]
pub struct HttpChainClient {
    provider: RootProvider,
}

impl HttpChainClient {
    /// Connects to the node at `rpc_url`.
    pub fn new_http(rpc_url: Url) -> Self {
        Self { provider: RootProvider::new_http(rpc_url) }
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn latest_block_number(&self) -> Result<u64, FetchError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn block_timestamp(&self, number: u64) -> Result<Option<u64>, FetchError> {
        let block = self.provider.get_block_by_number(number.into()).await?;
        Ok(block.map(|block| block.header.inner.timestamp))
    }

    async fn logs(&self, filter: &EventFilter, range: BlockRange) -> Result<Vec<Log>, FetchError> {
        Ok(self.provider.get_logs(&node_filter(filter, range)).await?)
    }
}

/// Translates a filter and range into the node's `eth_getLogs` parameter.
fn node_filter(filter: &EventFilter, range: BlockRange) -> Filter {
    let mut out = Filter::new().from_block(range.start()).to_block(range.end());
    if let Some(address) = filter.contract_address {
        out = out.address(address);
    }
    if let Some(topic) = filter.topics[0] {
        out = out.event_signature(topic);
    }
    if let Some(topic) = filter.topics[1] {
        out = out.topic1(topic);
    }
    if let Some(topic) = filter.topics[2] {
        out = out.topic2(topic);
    }
    if let Some(topic) = filter.topics[3] {
        out = out.topic3(topic);
    }
    out
}

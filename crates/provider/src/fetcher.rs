//! Chunked, concurrent retrieval of event logs.

use crate::{ChainClient, FetchError, RequestPacer, metrics::Metrics};
use almanac_types::{BlockRange, EncodedEvent, EventFilter, split_range};
use futures::{StreamExt, TryStreamExt, stream};
use std::{num::NonZeroU32, sync::Arc, time::Instant};
use tracing::{debug, trace};

/// Default upper bound on the blocks spanned by one `eth_getLogs` request.
pub const DEFAULT_MAX_BLOCKS_PER_REQUEST: u64 = 2_000;

/// Default number of requests kept in flight at once.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Tuning for the fetcher, sized for typical public RPC endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Blocks spanned by a single request. Ranges wider than this are split.
    pub max_blocks_per_request: u64,
    /// How many requests may be in flight concurrently.
    pub max_concurrent_requests: usize,
    /// Requests-per-second budget shared by every in-flight request.
    /// `None` leaves the rate unconstrained.
    pub requests_per_second: Option<NonZeroU32>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_blocks_per_request: DEFAULT_MAX_BLOCKS_PER_REQUEST,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            requests_per_second: None,
        }
    }
}

/// Retrieves event logs over wide block ranges by fanning out bounded,
/// paced chunk requests.
///
/// A fetch splits its range into chunks of at most
/// [`max_blocks_per_request`](FetchConfig::max_blocks_per_request) blocks,
/// keeps up to [`max_concurrent_requests`](FetchConfig::max_concurrent_requests)
/// of them in flight, and reassembles the results in canonical order. The
/// first failing chunk aborts the whole fetch; results of in-flight
/// siblings are dropped rather than stored partially.
#[derive(Debug)]
pub struct LogFetcher<C> {
    client: Arc<C>,
    pacer: RequestPacer,
    config: FetchConfig,
}

impl<C: ChainClient> LogFetcher<C> {
    /// Builds a fetcher over `client` with the given tuning.
    pub fn new(client: Arc<C>, config: FetchConfig) -> Self {
        Metrics::init();
        let pacer = RequestPacer::new(config.requests_per_second);
        Self { client, pacer, config }
    }

    /// The fetcher's tuning.
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches every event matching `filter` in `range`, in canonical
    /// order.
    pub async fn fetch_logs(
        &self,
        filter: &EventFilter,
        range: BlockRange,
    ) -> Result<Vec<EncodedEvent>, FetchError> {
        let chunks = split_range(range, self.config.max_blocks_per_request)?;
        debug!(
            target: "almanac_provider",
            %range,
            chunks = chunks.len(),
            "Fetching logs"
        );

        let batches = stream::iter(chunks.into_iter().map(|chunk| self.fetch_chunk(filter, chunk)))
            .buffered(self.config.max_concurrent_requests.max(1))
            .try_collect::<Vec<_>>()
            .await?;

        let mut events: Vec<EncodedEvent> = batches.into_iter().flatten().collect();
        // Chunks come back in request order; this only guards against a
        // node returning logs unsorted within one response.
        events.sort_unstable_by_key(|e| (e.block_number, e.transaction_index, e.log_index));
        Ok(events)
    }

    async fn fetch_chunk(
        &self,
        filter: &EventFilter,
        chunk: BlockRange,
    ) -> Result<Vec<EncodedEvent>, FetchError> {
        self.pacer.pace().await;

        let started = Instant::now();
        let logs = self.client.logs(filter, chunk).await?;
        Metrics::record_chunk(logs.len(), started.elapsed().as_secs_f64());
        trace!(target: "almanac_provider", %chunk, logs = logs.len(), "Fetched chunk");

        logs.iter().map(|log| Ok(EncodedEvent::try_from(log)?)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockChainClient;
    use alloy_primitives::{Address, B256, Bytes, LogData};
    use alloy_rpc_types_eth::Log;

    fn range(start: u64, end: u64) -> BlockRange {
        BlockRange::new(start, end).unwrap()
    }

    fn log_at(block_number: u64, log_index: u64) -> Log {
        Log {
            inner: alloy_primitives::Log {
                address: Address::repeat_byte(0xaa),
                data: LogData::new_unchecked(vec![B256::repeat_byte(0xd0)], Bytes::new()),
            },
            block_hash: Some(B256::repeat_byte(0x1b)),
            block_number: Some(block_number),
            block_timestamp: None,
            transaction_hash: Some(B256::repeat_byte(0x7f)),
            transaction_index: Some(0),
            log_index: Some(log_index),
            removed: false,
        }
    }

    fn fetcher(client: MockChainClient, max_blocks: u64) -> LogFetcher<MockChainClient> {
        LogFetcher::new(
            Arc::new(client),
            FetchConfig { max_blocks_per_request: max_blocks, ..Default::default() },
        )
    }

    #[tokio::test]
    async fn splits_wide_ranges_into_exact_chunk_requests() {
        let mut client = MockChainClient::new();
        client
            .expect_logs()
            .withf(|_, chunk| *chunk == range(0, 1_999))
            .times(1)
            .returning(|_, _| Ok(vec![log_at(1_500, 0)]));
        client
            .expect_logs()
            .withf(|_, chunk| *chunk == range(2_000, 2_499))
            .times(1)
            .returning(|_, _| Ok(vec![log_at(2_100, 0)]));

        let events =
            fetcher(client, 2_000).fetch_logs(&EventFilter::new(), range(0, 2_499)).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].block_number, 1_500);
        assert_eq!(events[1].block_number, 2_100);
    }

    #[tokio::test]
    async fn narrow_range_is_a_single_request() {
        let mut client = MockChainClient::new();
        client
            .expect_logs()
            .withf(|_, chunk| *chunk == range(100, 150))
            .times(1)
            .returning(|_, _| Ok(Vec::new()));

        let events =
            fetcher(client, 2_000).fetch_logs(&EventFilter::new(), range(100, 150)).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn reassembles_canonical_order_across_chunks() {
        let mut client = MockChainClient::new();
        client
            .expect_logs()
            .withf(|_, chunk| *chunk == range(0, 9))
            .returning(|_, _| Ok(vec![log_at(4, 2), log_at(4, 0)]));
        client
            .expect_logs()
            .withf(|_, chunk| *chunk == range(10, 19))
            .returning(|_, _| Ok(vec![log_at(12, 1)]));

        let events =
            fetcher(client, 10).fetch_logs(&EventFilter::new(), range(0, 19)).await.unwrap();
        let keys: Vec<(u64, u64)> = events.iter().map(EncodedEvent::key).collect();
        assert_eq!(keys, vec![(4, 0), (4, 2), (12, 1)]);
    }

    #[tokio::test]
    async fn first_failing_chunk_aborts_the_fetch() {
        let mut client = MockChainClient::new();
        client
            .expect_logs()
            .withf(|_, chunk| *chunk == range(0, 9))
            .times(1)
            .returning(|_, _| {
                Err(FetchError::Transport(alloy_transport::TransportErrorKind::custom_str(
                    "rate limited",
                )))
            });
        client
            .expect_logs()
            .withf(|_, chunk| *chunk != range(0, 9))
            .times(0..)
            .returning(|_, _| Ok(Vec::new()));

        let result = fetcher(client, 10).fetch_logs(&EventFilter::new(), range(0, 39)).await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn unusable_log_fails_the_fetch() {
        let mut client = MockChainClient::new();
        client.expect_logs().returning(|_, _| {
            let mut log = log_at(5, 0);
            log.block_number = None;
            Ok(vec![log])
        });

        let result = fetcher(client, 100).fetch_logs(&EventFilter::new(), range(0, 10)).await;
        assert!(matches!(result, Err(FetchError::Conversion(_))));
    }
}

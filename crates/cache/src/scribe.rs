//! The coordinator that answers event requests from cache and node.

use crate::{
    abi::{decode_event, resolve_spec},
    config::ScribeConfig,
    error::ScribeError,
    metrics::Metrics,
    page::EventPage,
    request::EventRequest,
};
use almanac_provider::{BlockTimestamps, ChainClient, LogFetcher, resolve_range};
use almanac_store::{
    EventSelection, EventStore, LedgerSelection, StoreStats, StoredEventQuery,
};
use almanac_types::{
    BlockRange, EncodedEvent, EventFilter, EventQuery, gate_batch, merge_ranges, uncovered_ranges,
};
use std::{
    collections::{BTreeMap, btree_map::Entry},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Answers event requests by combining the local store with remote fetches.
///
/// A request is planned against the coverage ledger: block ranges the ledger
/// proves cached are read from the store, only the gaps are fetched from the
/// node, and freshly fetched rows pass through the confirmation gate before
/// anything is persisted. Unconfirmed rows are still part of the answer;
/// they are just never remembered.
#[derive(Debug)]
pub struct EventScribe<C> {
    client: Arc<C>,
    fetcher: LogFetcher<C>,
    store: EventStore,
    timestamps: Mutex<BlockTimestamps<C>>,
    config: ScribeConfig,
}

impl<C: ChainClient> EventScribe<C> {
    /// Builds a scribe from a chain client, an open store, and its config.
    pub fn new(client: Arc<C>, store: EventStore, config: ScribeConfig) -> Self {
        Metrics::init();
        let fetcher = LogFetcher::new(client.clone(), config.policy.fetch);
        let timestamps = Mutex::new(BlockTimestamps::new(client.clone()));
        Self { client, fetcher, store, timestamps, config }
    }

    /// The scribe's configuration.
    pub const fn config(&self) -> &ScribeConfig {
        &self.config
    }

    /// The backing store.
    pub const fn store(&self) -> &EventStore {
        &self.store
    }

    /// The node's current tip height.
    pub async fn latest_block(&self) -> Result<u64, ScribeError> {
        Ok(self.client.latest_block_number().await?)
    }

    /// Answers `request` with a full page of events.
    ///
    /// The future resolves only once the whole resolved range is answered;
    /// there are no partial results.
    pub async fn events(&self, request: &EventRequest) -> Result<EventPage, ScribeError> {
        let range = resolve_range(self.client.as_ref(), request.start, request.end).await?;
        let (filter, event) = resolve_spec(&request.event, request.filter)?;
        if request.decode && event.is_none() {
            return Err(ScribeError::AbiResolution(
                "decoded output needs an event signature, not just a topic hash".to_string(),
            ));
        }

        debug!(
            target: "almanac_cache",
            network = %self.config.network,
            %range,
            kind = %filter.kind(),
            "Answering event request"
        );

        let policy = &self.config.policy;
        let (covered, gaps) = if policy.read_cache {
            self.plan(&filter, range)?
        } else {
            (Vec::new(), vec![range])
        };

        let mut events = Vec::new();
        let mut from_store = 0usize;
        for cover in &covered {
            let rows = self.store.select_events(&EventSelection::new(filter, *cover))?;
            from_store += rows.len();
            events.extend(rows);
        }

        let mut fetched = Vec::with_capacity(gaps.len());
        let mut from_node = 0usize;
        for gap in gaps {
            let rows = self.fetcher.fetch_logs(&filter, gap).await?;
            from_node += rows.len();
            fetched.push((gap, rows));
        }

        let persisted = if policy.write_cache { self.persist(&filter, &fetched).await? } else { 0 };

        for (_, rows) in fetched {
            events.extend(rows);
        }
        // Covers and gaps partition the range, so the merge cannot
        // introduce duplicate keys.
        events.sort_unstable_by_key(|row| (row.block_number, row.transaction_index, row.log_index));
        Metrics::record_split(from_store, from_node);

        let decoded = match (&event, request.decode) {
            (Some(event), true) => Some(
                events.iter().map(|row| decode_event(event, row)).collect::<Result<Vec<_>, _>>()?,
            ),
            _ => None,
        };
        let timestamps =
            if request.timestamps { Some(self.attach_timestamps(&events).await?) } else { None };

        debug!(
            target: "almanac_cache",
            events = events.len(),
            from_store,
            from_node,
            persisted,
            "Event request answered"
        );
        Ok(EventPage { range, events, decoded, timestamps, from_store, from_node, persisted })
    }

    /// Coverage ledger entries recorded for `filter`, optionally narrowed
    /// to those overlapping `range`.
    pub fn coverage(
        &self,
        filter: EventFilter,
        range: Option<BlockRange>,
    ) -> Result<Vec<StoredEventQuery>, ScribeError> {
        Ok(self.store.select_queries(&ledger_selection(filter, range))?)
    }

    /// Removes ledger entries by identifier, returning the removed queries
    /// in order. Stops at the first missing identifier.
    pub fn forget(&self, ids: &[i64]) -> Result<Vec<EventQuery>, ScribeError> {
        ids.iter().map(|id| Ok(self.store.delete_query(*id)?)).collect()
    }

    /// Removes every ledger entry recorded for `filter`, optionally only
    /// those overlapping `range`. Returns how many were removed.
    pub fn forget_matching(
        &self,
        filter: EventFilter,
        range: Option<BlockRange>,
    ) -> Result<usize, ScribeError> {
        Ok(self.store.delete_queries(&ledger_selection(filter, range))?)
    }

    /// Row counts of the backing store.
    pub fn stats(&self) -> Result<StoreStats, ScribeError> {
        Ok(self.store.stats()?)
    }

    /// Splits `range` into ledger-covered portions and the gaps still to
    /// fetch.
    fn plan(
        &self,
        filter: &EventFilter,
        range: BlockRange,
    ) -> Result<(Vec<BlockRange>, Vec<BlockRange>), ScribeError> {
        let entries = self.store.select_queries(&LedgerSelection::overlapping(*filter, range))?;
        let covered = merge_ranges(
            entries.iter().filter_map(|entry| entry.query.range.intersect(&range)).collect(),
        );
        let gaps = uncovered_ranges(range, &covered);
        trace!(
            target: "almanac_cache",
            %range,
            covered = covered.len(),
            gaps = gaps.len(),
            "Planned coverage"
        );
        Ok((covered, gaps))
    }

    /// Gates each fetched batch and writes the safe portion. Returns how
    /// many rows were persisted.
    ///
    /// Gating reads the head afresh at persist time, not fetch time, so
    /// recorded coverage never exceeds the confirmed head observed at the
    /// write, even when the head moved backwards mid-call.
    async fn persist(
        &self,
        filter: &EventFilter,
        fetched: &[(BlockRange, Vec<EncodedEvent>)],
    ) -> Result<usize, ScribeError> {
        if fetched.is_empty() {
            return Ok(0);
        }
        let latest = self.client.latest_block_number().await?;
        let confirmations = self.config.policy.required_confirmations;

        let mut persisted = 0usize;
        let mut rejected = 0usize;
        let mut queries = Vec::new();
        for (gap, rows) in fetched {
            let gated =
                gate_batch(rows.clone(), EventQuery::new(*filter, *gap), latest, confirmations);
            rejected += rows.len() - gated.events.len();
            if !gated.events.is_empty() {
                persisted += self.store.upsert_events(&gated.events)?;
            }
            if let Some(query) = gated.query {
                queries.push(query);
            }
        }
        if !queries.is_empty() {
            self.store.record_queries(&queries)?;
        }

        Metrics::record_persist(persisted, rejected);
        if rejected > 0 {
            debug!(
                target: "almanac_cache",
                rejected,
                latest,
                confirmations,
                "Confirmation gate rejected rows"
            );
        }
        Ok(persisted)
    }

    /// Looks up the timestamp of every block carrying a row.
    async fn attach_timestamps(
        &self,
        events: &[EncodedEvent],
    ) -> Result<BTreeMap<u64, u64>, ScribeError> {
        let mut cache = self.timestamps.lock().await;
        let mut attached = BTreeMap::new();
        for block in events.iter().map(|event| event.block_number) {
            if let Entry::Vacant(slot) = attached.entry(block) {
                slot.insert(cache.lookup(block).await?);
            }
        }
        Ok(attached)
    }
}

const fn ledger_selection(filter: EventFilter, range: Option<BlockRange>) -> LedgerSelection {
    match range {
        Some(range) => LedgerSelection::overlapping(filter, range),
        None => LedgerSelection::all_ranges(filter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{CachePolicy, NetworkTag},
        request::EventSpec,
    };
    use almanac_provider::FetchError;
    use almanac_types::BlockRef;
    use alloy_dyn_abi::DynSolValue;
    use alloy_primitives::{Address, B256, Bytes, LogData, U256, b256};
    use alloy_rpc_types_eth::Log;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const TRANSFER_SIG: &str = "Transfer(address indexed from, address indexed to, uint256 value)";
    const TRANSFER_SELECTOR: B256 =
        b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

    /// Serves scripted logs and a scripted tip, recording every log request.
    #[derive(Debug)]
    struct ScriptedChain {
        heads: Mutex<Vec<u64>>,
        logs: Vec<Log>,
        log_calls: Mutex<Vec<BlockRange>>,
    }

    impl ScriptedChain {
        fn new(latest: u64, logs: Vec<Log>) -> Self {
            Self::with_heads(vec![latest], logs)
        }

        /// Each head read consumes the next scripted value; the last one
        /// repeats.
        fn with_heads(heads: Vec<u64>, logs: Vec<Log>) -> Self {
            Self { heads: Mutex::new(heads), logs, log_calls: Mutex::new(Vec::new()) }
        }

        fn log_calls(&self) -> Vec<BlockRange> {
            self.log_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainClient for ScriptedChain {
        async fn latest_block_number(&self) -> Result<u64, FetchError> {
            let mut heads = self.heads.lock().unwrap();
            if heads.len() > 1 {
                return Ok(heads.remove(0));
            }
            Ok(heads[0])
        }

        async fn block_timestamp(&self, number: u64) -> Result<Option<u64>, FetchError> {
            let tip = *self.heads.lock().unwrap().last().unwrap();
            Ok((number <= tip).then_some(1_000 + 12 * number))
        }

        async fn logs(
            &self,
            _filter: &EventFilter,
            range: BlockRange,
        ) -> Result<Vec<Log>, FetchError> {
            self.log_calls.lock().unwrap().push(range);
            Ok(self
                .logs
                .iter()
                .filter(|log| log.block_number.is_some_and(|number| range.contains(number)))
                .cloned()
                .collect())
        }
    }

    fn log_at(block_number: u64, log_index: u64) -> Log {
        log_with(block_number, log_index, vec![B256::repeat_byte(0xd0)], Bytes::new())
    }

    fn log_with(block_number: u64, log_index: u64, topics: Vec<B256>, data: Bytes) -> Log {
        Log {
            inner: alloy_primitives::Log {
                address: Address::repeat_byte(0xaa),
                data: LogData::new_unchecked(topics, data),
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

    fn scribe(client: &Arc<ScriptedChain>, policy: CachePolicy) -> EventScribe<ScriptedChain> {
        EventScribe::new(
            client.clone(),
            EventStore::open_in_memory().unwrap(),
            ScribeConfig { network: NetworkTag::new("testnet"), policy },
        )
    }

    fn range(start: u64, end: u64) -> BlockRange {
        BlockRange::new(start, end).unwrap()
    }

    #[tokio::test]
    async fn second_request_is_served_from_the_store() {
        let client = Arc::new(ScriptedChain::new(1_000, vec![log_at(120, 0), log_at(180, 1)]));
        let scribe = scribe(&client, CachePolicy::default());
        let request = EventRequest::new(100u64, 200u64);

        let cold = scribe.events(&request).await.unwrap();
        assert_eq!(cold.range, range(100, 200));
        assert_eq!((cold.from_store, cold.from_node, cold.persisted), (0, 2, 2));
        assert_eq!(client.log_calls(), vec![range(100, 200)]);

        let warm = scribe.events(&request).await.unwrap();
        assert_eq!(warm.events, cold.events);
        assert_eq!((warm.from_store, warm.from_node, warm.persisted), (2, 0, 0));
        // No further node traffic.
        assert_eq!(client.log_calls(), vec![range(100, 200)]);
    }

    #[tokio::test]
    async fn partial_coverage_fetches_only_the_gap() {
        let client = Arc::new(ScriptedChain::new(1_000, vec![log_at(120, 0), log_at(160, 0)]));
        let scribe = scribe(&client, CachePolicy::default());

        // The ledger already covers [100, 150] and the store holds its row.
        let seeded = EncodedEvent::try_from(&log_at(120, 0)).unwrap();
        scribe.store().upsert_events(&[seeded]).unwrap();
        scribe
            .store()
            .record_query(&EventQuery::new(EventFilter::new(), range(100, 150)))
            .unwrap();

        let page = scribe.events(&EventRequest::new(100u64, 200u64)).await.unwrap();
        assert_eq!(client.log_calls(), vec![range(151, 200)]);
        assert_eq!((page.from_store, page.from_node, page.persisted), (1, 1, 1));
        let blocks: Vec<u64> = page.events.iter().map(|event| event.block_number).collect();
        assert_eq!(blocks, vec![120, 160]);
    }

    #[tokio::test]
    async fn gate_returns_unconfirmed_rows_without_persisting_them() {
        let client =
            Arc::new(ScriptedChain::new(100, vec![log_at(89, 0), log_at(91, 0), log_at(95, 0)]));
        let policy = CachePolicy { required_confirmations: 10, ..Default::default() };
        let scribe = scribe(&client, policy);

        let page = scribe.events(&EventRequest::new(50u64, 95u64)).await.unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page.persisted, 1);

        // Only the confirmed prefix is remembered.
        let entries = scribe.coverage(EventFilter::new(), None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query.range, range(50, 90));
        assert_eq!(scribe.stats().unwrap().events, 1);
    }

    #[tokio::test]
    async fn fully_unconfirmed_fetch_is_returned_but_never_recorded() {
        let client = Arc::new(ScriptedChain::new(100, vec![log_at(96, 0)]));
        let policy = CachePolicy { required_confirmations: 10, ..Default::default() };
        let scribe = scribe(&client, policy);

        let page = scribe.events(&EventRequest::new(95u64, 99u64)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.persisted, 0);
        assert_eq!(scribe.stats().unwrap(), StoreStats { events: 0, queries: 0 });
    }

    #[tokio::test]
    async fn coverage_is_bounded_by_the_head_at_write_time() {
        // The head reads 100 while the range resolves, then a reorg leaves
        // it at 95 by the time results are written.
        let client =
            Arc::new(ScriptedChain::with_heads(vec![100, 95], vec![log_at(80, 0), log_at(88, 0)]));
        let policy = CachePolicy { required_confirmations: 10, ..Default::default() };
        let scribe = scribe(&client, policy);

        let page = scribe.events(&EventRequest::new(50u64, BlockRef::Latest)).await.unwrap();
        assert_eq!(page.range, range(50, 100));
        assert_eq!(page.len(), 2);
        assert_eq!(page.persisted, 1);

        let entries = scribe.coverage(EventFilter::new(), None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query.range, range(50, 85));
    }

    #[tokio::test]
    async fn read_cache_off_refetches_covered_blocks() {
        let client = Arc::new(ScriptedChain::new(1_000, vec![log_at(120, 0)]));
        let policy = CachePolicy { read_cache: false, ..Default::default() };
        let scribe = scribe(&client, policy);
        scribe
            .store()
            .record_query(&EventQuery::new(EventFilter::new(), range(100, 200)))
            .unwrap();

        let page = scribe.events(&EventRequest::new(100u64, 200u64)).await.unwrap();
        assert_eq!(client.log_calls(), vec![range(100, 200)]);
        assert_eq!((page.from_store, page.from_node), (0, 1));
    }

    #[tokio::test]
    async fn write_cache_off_persists_nothing() {
        let client = Arc::new(ScriptedChain::new(1_000, vec![log_at(120, 0)]));
        let policy = CachePolicy { write_cache: false, ..Default::default() };
        let scribe = scribe(&client, policy);

        let page = scribe.events(&EventRequest::new(100u64, 200u64)).await.unwrap();
        assert_eq!(page.from_node, 1);
        assert_eq!(page.persisted, 0);
        assert_eq!(scribe.stats().unwrap(), StoreStats { events: 0, queries: 0 });
    }

    #[tokio::test]
    async fn conflicting_topic0_is_rejected() {
        let client = Arc::new(ScriptedChain::new(1_000, Vec::new()));
        let scribe = scribe(&client, CachePolicy::default());

        let request = EventRequest::new(0u64, 10u64)
            .with_filter(EventFilter::new().with_event(B256::repeat_byte(0x99)))
            .with_signature(TRANSFER_SIG);
        let result = scribe.events(&request).await;
        assert!(matches!(
            result,
            Err(ScribeError::InconsistentFilter { expected, .. }) if expected == TRANSFER_SELECTOR
        ));
    }

    #[tokio::test]
    async fn decoding_needs_a_signature() {
        let client = Arc::new(ScriptedChain::new(1_000, Vec::new()));
        let scribe = scribe(&client, CachePolicy::default());

        let request = EventRequest::new(0u64, 10u64).with_event_hash(TRANSFER_SELECTOR).decoded();
        assert!(matches!(scribe.events(&request).await, Err(ScribeError::AbiResolution(_))));
    }

    #[tokio::test]
    async fn decodes_rows_against_the_signature() {
        let from = Address::repeat_byte(0x11);
        let to = Address::repeat_byte(0x22);
        let log = log_with(
            150,
            0,
            vec![
                TRANSFER_SELECTOR,
                B256::left_padding_from(from.as_slice()),
                B256::left_padding_from(to.as_slice()),
            ],
            Bytes::from(U256::from(1_000).to_be_bytes::<32>().to_vec()),
        );
        let client = Arc::new(ScriptedChain::new(1_000, vec![log]));
        let scribe = scribe(&client, CachePolicy::default());

        let request = EventRequest::new(100u64, 200u64).with_signature(TRANSFER_SIG).decoded();
        let page = scribe.events(&request).await.unwrap();

        let decoded = page.decoded.unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "Transfer");
        assert_eq!(
            decoded[0].params,
            vec![
                ("from".to_string(), DynSolValue::Address(from)),
                ("to".to_string(), DynSolValue::Address(to)),
                ("value".to_string(), DynSolValue::Uint(U256::from(1_000), 256)),
            ],
        );
    }

    #[tokio::test]
    async fn attaches_timestamps_for_blocks_carrying_rows() {
        let client =
            Arc::new(ScriptedChain::new(1_000, vec![log_at(5, 0), log_at(5, 1), log_at(7, 0)]));
        let scribe = scribe(&client, CachePolicy::default());

        let request = EventRequest::new(0u64, 10u64).with_timestamps();
        let page = scribe.events(&request).await.unwrap();

        assert_eq!(page.timestamp_of(7), Some(1_084));
        assert_eq!(page.timestamps.unwrap(), BTreeMap::from([(5, 1_060), (7, 1_084)]));
    }

    #[tokio::test]
    async fn resolves_timestamp_bounds_before_planning() {
        let client = Arc::new(ScriptedChain::new(1_000, vec![log_at(6, 0)]));
        let scribe = scribe(&client, CachePolicy::default());

        let request = EventRequest::new(BlockRef::Timestamp(1_060), BlockRef::Timestamp(1_084));
        let page = scribe.events(&request).await.unwrap();
        assert_eq!(page.range, range(5, 7));
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn coverage_listing_and_forget_round_trip() {
        let client = Arc::new(ScriptedChain::new(1_000, Vec::new()));
        let scribe = scribe(&client, CachePolicy::default());
        scribe.events(&EventRequest::new(0u64, 50u64)).await.unwrap();

        let entries = scribe.coverage(EventFilter::new(), None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query.range, range(0, 50));

        let removed = scribe.forget(&[entries[0].id]).unwrap();
        assert_eq!(removed, vec![entries[0].query]);
        assert!(scribe.coverage(EventFilter::new(), None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn forget_matching_clears_one_filters_ledger() {
        let client = Arc::new(ScriptedChain::new(1_000, Vec::new()));
        let scribe = scribe(&client, CachePolicy::default());
        let filter = EventFilter::new().with_event(TRANSFER_SELECTOR);
        scribe.store().record_query(&EventQuery::new(filter, range(0, 10))).unwrap();
        scribe.store().record_query(&EventQuery::new(filter, range(20, 30))).unwrap();
        scribe.store().record_query(&EventQuery::new(EventFilter::new(), range(0, 10))).unwrap();

        assert_eq!(scribe.forget_matching(filter, None).unwrap(), 2);
        assert_eq!(scribe.stats().unwrap().queries, 1);
    }

    #[tokio::test]
    async fn reports_the_chain_tip() {
        let client = Arc::new(ScriptedChain::new(123_456, Vec::new()));
        let scribe = scribe(&client, CachePolicy::default());
        assert_eq!(scribe.latest_block().await.unwrap(), 123_456);
    }

    #[tokio::test]
    async fn empty_fetch_still_records_coverage() {
        let client = Arc::new(ScriptedChain::new(1_000, Vec::new()));
        let scribe = scribe(&client, CachePolicy::default());

        let page = scribe.events(&EventRequest::new(100u64, 200u64)).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.persisted, 0);

        // A range known to hold nothing is coverage too.
        let entries = scribe.coverage(EventFilter::new(), None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query.range, range(100, 200));
        assert!(matches!(
            scribe.events(&EventRequest::new(100u64, 200u64)).await,
            Ok(page) if page.from_node == 0
        ));
    }

    #[tokio::test]
    async fn request_marked_none_spec_keeps_raw_topic_filters() {
        let topic = B256::repeat_byte(0xe1);
        let matching = log_with(
            150,
            0,
            vec![B256::repeat_byte(0xd0), topic],
            Bytes::new(),
        );
        let client = Arc::new(ScriptedChain::new(1_000, vec![matching]));
        let scribe = scribe(&client, CachePolicy::default());

        let request = EventRequest::new(100u64, 200u64)
            .with_filter(EventFilter::new().with_topic(1, topic));
        assert_eq!(request.event, EventSpec::None);

        let page = scribe.events(&request).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.events[0].topic1, Some(topic));
    }
}

//! Metrics for log retrieval.

/// Observability hooks for the fetcher.
#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    pub(crate) const FETCH_REQUESTS_TOTAL: &'static str = "almanac_fetch_requests_total";
    pub(crate) const FETCHED_EVENTS_TOTAL: &'static str = "almanac_fetched_events_total";
    pub(crate) const FETCH_CHUNK_DURATION_SECONDS: &'static str =
        "almanac_fetch_chunk_duration_seconds";

    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::FETCH_REQUESTS_TOTAL,
            metrics::Unit::Count,
            "Total number of eth_getLogs requests issued",
        );

        metrics::describe_counter!(
            Self::FETCHED_EVENTS_TOTAL,
            metrics::Unit::Count,
            "Total number of event logs returned by the node",
        );

        metrics::describe_histogram!(
            Self::FETCH_CHUNK_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Latency of individual eth_getLogs requests",
        );
    }

    fn zero() {
        metrics::counter!(Self::FETCH_REQUESTS_TOTAL).increment(0);
        metrics::counter!(Self::FETCHED_EVENTS_TOTAL).increment(0);
        metrics::histogram!(Self::FETCH_CHUNK_DURATION_SECONDS).record(0.0);
    }

    pub(crate) fn record_chunk(logs: usize, elapsed_seconds: f64) {
        metrics::counter!(Self::FETCH_REQUESTS_TOTAL).increment(1);
        metrics::counter!(Self::FETCHED_EVENTS_TOTAL).increment(logs as u64);
        metrics::histogram!(Self::FETCH_CHUNK_DURATION_SECONDS).record(elapsed_seconds);
    }
}

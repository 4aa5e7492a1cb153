//! Metrics for cache coordination.

/// Observability hooks for the scribe.
#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    pub(crate) const STORE_EVENTS_TOTAL: &'static str = "almanac_cache_store_events_total";
    pub(crate) const NODE_EVENTS_TOTAL: &'static str = "almanac_cache_node_events_total";
    pub(crate) const PERSISTED_EVENTS_TOTAL: &'static str = "almanac_cache_persisted_events_total";
    pub(crate) const GATE_REJECTED_EVENTS_TOTAL: &'static str =
        "almanac_cache_gate_rejected_events_total";

    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::STORE_EVENTS_TOTAL,
            metrics::Unit::Count,
            "Total number of event rows served from the local store",
        );

        metrics::describe_counter!(
            Self::NODE_EVENTS_TOTAL,
            metrics::Unit::Count,
            "Total number of event rows fetched from the node",
        );

        metrics::describe_counter!(
            Self::PERSISTED_EVENTS_TOTAL,
            metrics::Unit::Count,
            "Total number of event rows persisted after gating",
        );

        metrics::describe_counter!(
            Self::GATE_REJECTED_EVENTS_TOTAL,
            metrics::Unit::Count,
            "Total number of fetched rows rejected by the confirmation gate",
        );
    }

    fn zero() {
        metrics::counter!(Self::STORE_EVENTS_TOTAL).increment(0);
        metrics::counter!(Self::NODE_EVENTS_TOTAL).increment(0);
        metrics::counter!(Self::PERSISTED_EVENTS_TOTAL).increment(0);
        metrics::counter!(Self::GATE_REJECTED_EVENTS_TOTAL).increment(0);
    }

    pub(crate) fn record_split(from_store: usize, from_node: usize) {
        metrics::counter!(Self::STORE_EVENTS_TOTAL).increment(from_store as u64);
        metrics::counter!(Self::NODE_EVENTS_TOTAL).increment(from_node as u64);
    }

    pub(crate) fn record_persist(persisted: usize, rejected: usize) {
        metrics::counter!(Self::PERSISTED_EVENTS_TOTAL).increment(persisted as u64);
        metrics::counter!(Self::GATE_REJECTED_EVENTS_TOTAL).increment(rejected as u64);
    }
}

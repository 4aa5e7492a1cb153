//! Schema definition and connection setup.

use rusqlite::Connection;

/// The two tables behind the cache.
///
/// `events` holds one row per emitted event, keyed by block number and
/// block-scoped log index. `event_queries` is the coverage ledger: one row
/// per completed fetch, recording the constraints that were applied and the
/// inclusive block range they were applied over. Filter columns of a ledger
/// row are NULL exactly where the recorded query left them unconstrained,
/// and `query_type` mirrors that as a bitmask.
pub(crate) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    block_number      INTEGER NOT NULL,
    transaction_index INTEGER NOT NULL,
    log_index         INTEGER NOT NULL,
    transaction_hash  BLOB NOT NULL,
    contract_address  BLOB NOT NULL,
    event_hash        BLOB NOT NULL,
    topic1            BLOB,
    topic2            BLOB,
    topic3            BLOB,
    unindexed         BLOB NOT NULL,
    PRIMARY KEY (block_number, log_index)
);

CREATE INDEX IF NOT EXISTS idx_events_contract
    ON events (contract_address, block_number);
CREATE INDEX IF NOT EXISTS idx_events_signature
    ON events (event_hash, block_number);
CREATE INDEX IF NOT EXISTS idx_events_topic1 ON events (topic1);
CREATE INDEX IF NOT EXISTS idx_events_topic2 ON events (topic2);
CREATE INDEX IF NOT EXISTS idx_events_topic3 ON events (topic3);

CREATE TABLE IF NOT EXISTS event_queries (
    query_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    query_type       INTEGER NOT NULL,
    contract_address BLOB,
    topic0           BLOB,
    topic1           BLOB,
    topic2           BLOB,
    topic3           BLOB,
    start_block      INTEGER NOT NULL,
    end_block        INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_event_queries_lookup
    ON event_queries (query_type, contract_address, topic0);
CREATE INDEX IF NOT EXISTS idx_event_queries_range
    ON event_queries (start_block, end_block);
";

/// Applies connection pragmas and creates the schema if it is absent.
pub(crate) fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.execute_batch(SCHEMA)
}

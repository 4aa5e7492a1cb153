//! The SQLite-backed event store and coverage ledger.

use crate::{
    error::{RowKindError, RowWidthError, StorageError, is_missing_table},
    schema,
    select::{BoundMode, EventSelection, LedgerSelection, StoredEventQuery},
};
use almanac_types::{BlockRange, EncodedEvent, EventFilter, EventQuery};
use alloy_primitives::{Address, B256, Bytes};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params, params_from_iter, types::Type};
use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};
use tracing::{debug, trace};

const EVENT_COLUMNS: &str = "block_number, transaction_index, log_index, transaction_hash, \
     contract_address, event_hash, topic1, topic2, topic3, unindexed";

const QUERY_COLUMNS: &str = "query_id, query_type, contract_address, topic0, topic1, topic2, \
     topic3, start_block, end_block";

const UPSERT_EVENT: &str = "INSERT INTO events (block_number, transaction_index, log_index, \
     transaction_hash, contract_address, event_hash, topic1, topic2, topic3, unindexed) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
     ON CONFLICT (block_number, log_index) DO UPDATE SET \
     transaction_index = excluded.transaction_index, \
     transaction_hash = excluded.transaction_hash, \
     contract_address = excluded.contract_address, \
     event_hash = excluded.event_hash, \
     topic1 = excluded.topic1, \
     topic2 = excluded.topic2, \
     topic3 = excluded.topic3, \
     unindexed = excluded.unindexed";

// `IS` instead of `=` so unconstrained (NULL) filter columns compare equal.
const SELECT_EXACT_ENTRY: &str = "SELECT query_id FROM event_queries WHERE query_type = ? \
     AND contract_address IS ? AND topic0 IS ? AND topic1 IS ? AND topic2 IS ? AND topic3 IS ? \
     AND start_block = ? AND end_block = ?";

const INSERT_ENTRY: &str = "INSERT INTO event_queries (query_type, contract_address, topic0, \
     topic1, topic2, topic3, start_block, end_block) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

const CANONICAL_ORDER: &str = " ORDER BY block_number, transaction_index, log_index";

const EVENT_FILTER_COLUMNS: [&str; 5] =
    ["contract_address", "event_hash", "topic1", "topic2", "topic3"];
const LEDGER_FILTER_COLUMNS: [&str; 5] =
    ["contract_address", "topic0", "topic1", "topic2", "topic3"];

/// Row counts of the two tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of cached events.
    pub events: u64,
    /// Number of coverage ledger entries.
    pub queries: u64,
}

/// Persistent storage for cached events and the coverage ledger.
///
/// The API is synchronous; one connection sits behind a mutex, and callers
/// in async context treat operations as fast local I/O. Writes run inside
/// transactions and are idempotent: replaying a batch of events or
/// re-recording a completed query leaves the database unchanged. Event
/// reads always come back in canonical order, ascending by block number,
/// transaction index and log index.
#[derive(Debug)]
pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    /// Opens (creating if necessary) the database at `path`.
    ///
    /// Missing parent directories are created. The schema is applied if the
    /// database is new.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        debug!(target: "almanac_store", path = %path.display(), "Opened event store");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens a fresh in-memory store.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Wraps an existing connection without applying the schema.
    ///
    /// Reads against a connection whose tables were never created return
    /// empty results rather than failing.
    pub const fn from_connection(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Inserts events, replacing any previously stored row with the same
    /// block number and log index.
    pub fn upsert_events(&self, events: &[EncodedEvent]) -> Result<usize, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_EVENT)?;
            for event in events {
                stmt.execute(params![
                    event.block_number,
                    event.transaction_index,
                    event.log_index,
                    event.transaction_hash.to_vec(),
                    event.contract_address.to_vec(),
                    event.event_hash.to_vec(),
                    event.topic1.map(|t| t.to_vec()),
                    event.topic2.map(|t| t.to_vec()),
                    event.topic3.map(|t| t.to_vec()),
                    event.unindexed.to_vec(),
                ])?;
            }
        }
        tx.commit()?;
        trace!(target: "almanac_store", count = events.len(), "Upserted events");
        Ok(events.len())
    }

    /// Records a completed query in the coverage ledger.
    ///
    /// An entry with identical constraints and bounds is reused, so
    /// replaying a fetch never duplicates ledger rows. Returns the entry
    /// identifier either way.
    pub fn record_query(&self, query: &EventQuery) -> Result<i64, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = record_entry(&tx, query)?;
        tx.commit()?;
        Ok(id)
    }

    /// Records several completed queries in one transaction.
    pub fn record_queries(&self, queries: &[EventQuery]) -> Result<Vec<i64>, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let ids =
            queries.iter().map(|query| record_entry(&tx, query)).collect::<Result<Vec<_>, _>>()?;
        tx.commit()?;
        Ok(ids)
    }

    /// Reads events matching a selection, in canonical order.
    pub fn select_events(
        &self,
        selection: &EventSelection,
    ) -> Result<Vec<EncodedEvent>, StorageError> {
        let mut clauses = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        filter_clauses(&selection.filter, &EVENT_FILTER_COLUMNS, &mut clauses, &mut params);
        if let Some(range) = selection.range {
            clauses.push("block_number >= ?".to_string());
            params.push(Box::new(range.start()));
            clauses.push("block_number <= ?".to_string());
            params.push(Box::new(range.end()));
        }

        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events");
        append_where(&mut sql, &clauses);
        sql.push_str(CANONICAL_ORDER);

        let conn = self.lock()?;
        let mut stmt = match conn.prepare(&sql) {
            Ok(stmt) => stmt,
            Err(error) if is_missing_table(&error) => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        let rows = stmt.query_map(params_from_iter(params.iter()), decode_event)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Reads coverage ledger entries matching a selection.
    pub fn select_queries(
        &self,
        selection: &LedgerSelection,
    ) -> Result<Vec<StoredEventQuery>, StorageError> {
        let (mut sql, params) =
            ledger_where(selection, format!("SELECT {QUERY_COLUMNS} FROM event_queries"));
        sql.push_str(" ORDER BY query_id");

        let conn = self.lock()?;
        let mut stmt = match conn.prepare(&sql) {
            Ok(stmt) => stmt,
            Err(error) if is_missing_table(&error) => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        let rows = stmt.query_map(params_from_iter(params.iter()), decode_stored_query)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Removes one ledger entry by identifier, returning the query it
    /// recorded.
    pub fn delete_query(&self, id: i64) -> Result<EventQuery, StorageError> {
        let sql = format!("DELETE FROM event_queries WHERE query_id = ? RETURNING {QUERY_COLUMNS}");
        let conn = self.lock()?;
        let removed = conn.query_row(&sql, params![id], decode_stored_query).optional()?;
        removed.map(|stored| stored.query).ok_or(StorageError::EntryNotFound(id))
    }

    /// Removes every ledger entry matching a selection, returning how many
    /// were removed.
    pub fn delete_queries(&self, selection: &LedgerSelection) -> Result<usize, StorageError> {
        let (sql, params) = ledger_where(selection, "DELETE FROM event_queries".to_string());
        let conn = self.lock()?;
        let removed = conn.execute(&sql, params_from_iter(params.iter()))?;
        debug!(target: "almanac_store", removed, "Deleted ledger entries");
        Ok(removed)
    }

    /// Row counts for both tables. Absent tables count as zero.
    pub fn stats(&self) -> Result<StoreStats, StorageError> {
        let conn = self.lock()?;
        Ok(StoreStats {
            events: count(&conn, "events")?,
            queries: count(&conn, "event_queries")?,
        })
    }
}

fn count(conn: &Connection, table: &str) -> Result<u64, StorageError> {
    match conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0)) {
        Ok(rows) => Ok(rows),
        Err(error) if is_missing_table(&error) => Ok(0),
        Err(error) => Err(error.into()),
    }
}

fn record_entry(conn: &Connection, query: &EventQuery) -> Result<i64, rusqlite::Error> {
    let filter = &query.filter;
    let params: Vec<Box<dyn ToSql>> = vec![
        Box::new(query.kind().bits()),
        Box::new(filter.contract_address.map(|a| a.to_vec())),
        Box::new(filter.topics[0].map(|t| t.to_vec())),
        Box::new(filter.topics[1].map(|t| t.to_vec())),
        Box::new(filter.topics[2].map(|t| t.to_vec())),
        Box::new(filter.topics[3].map(|t| t.to_vec())),
        Box::new(query.range.start()),
        Box::new(query.range.end()),
    ];

    let existing = conn
        .query_row(SELECT_EXACT_ENTRY, params_from_iter(params.iter()), |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        trace!(target: "almanac_store", id, "Ledger entry already recorded");
        return Ok(id);
    }
    conn.execute(INSERT_ENTRY, params_from_iter(params.iter()))?;
    Ok(conn.last_insert_rowid())
}

fn filter_clauses(
    filter: &EventFilter,
    columns: &[&str; 5],
    clauses: &mut Vec<String>,
    params: &mut Vec<Box<dyn ToSql>>,
) {
    if let Some(address) = filter.contract_address {
        clauses.push(format!("{} = ?", columns[0]));
        params.push(Box::new(address.to_vec()));
    }
    for (topic, column) in filter.topics.iter().zip(&columns[1..]) {
        if let Some(topic) = topic {
            clauses.push(format!("{column} = ?"));
            params.push(Box::new(topic.to_vec()));
        }
    }
}

fn ledger_where(selection: &LedgerSelection, mut sql: String) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(filter) = &selection.filter {
        // Matching on the kind bitmask pins which columns are NULL, so only
        // the bound columns need value comparisons. A selection without a
        // filter skips the kind pin and matches entries of every kind.
        clauses.push("query_type = ?".to_string());
        params.push(Box::new(filter.kind().bits()));
        filter_clauses(filter, &LEDGER_FILTER_COLUMNS, &mut clauses, &mut params);
    }

    if let Some(range) = selection.range {
        match selection.bounds {
            BoundMode::Overlap => {
                clauses.push("start_block <= ?".to_string());
                params.push(Box::new(range.end()));
                clauses.push("end_block >= ?".to_string());
                params.push(Box::new(range.start()));
            }
            BoundMode::Exact => {
                clauses.push("start_block = ?".to_string());
                params.push(Box::new(range.start()));
                clauses.push("end_block = ?".to_string());
                params.push(Box::new(range.end()));
            }
        }
    }
    append_where(&mut sql, &clauses);
    (sql, params)
}

fn append_where(sql: &mut String, clauses: &[String]) {
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
}

fn decode_event(row: &Row<'_>) -> rusqlite::Result<EncodedEvent> {
    Ok(EncodedEvent {
        block_number: row.get(0)?,
        transaction_index: row.get(1)?,
        log_index: row.get(2)?,
        transaction_hash: read_word(row, 3)?,
        contract_address: read_address(row, 4)?,
        event_hash: read_word(row, 5)?,
        topic1: read_optional_word(row, 6)?,
        topic2: read_optional_word(row, 7)?,
        topic3: read_optional_word(row, 8)?,
        unindexed: Bytes::from(row.get::<_, Vec<u8>>(9)?),
    })
}

fn decode_stored_query(row: &Row<'_>) -> rusqlite::Result<StoredEventQuery> {
    let id = row.get(0)?;
    let stored: u8 = row.get(1)?;

    let mut filter = EventFilter::new();
    filter.contract_address = read_optional_address(row, 2)?;
    for (position, index) in (3..=6).enumerate() {
        filter.topics[position] = read_optional_word(row, index)?;
    }

    let derived = filter.kind().bits();
    if derived != stored {
        return Err(rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Integer,
            Box::new(RowKindError { stored, derived }),
        ));
    }

    let range = BlockRange::new(row.get(7)?, row.get(8)?).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(7, Type::Integer, Box::new(error))
    })?;
    Ok(StoredEventQuery { id, query: EventQuery::new(filter, range) })
}

fn read_word(row: &Row<'_>, index: usize) -> rusqlite::Result<B256> {
    let blob: Vec<u8> = row.get(index)?;
    B256::try_from(blob.as_slice()).map_err(|_| blob_width(index, blob.len(), 32))
}

fn read_optional_word(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<B256>> {
    let blob: Option<Vec<u8>> = row.get(index)?;
    blob.map(|blob| B256::try_from(blob.as_slice()).map_err(|_| blob_width(index, blob.len(), 32)))
        .transpose()
}

fn read_address(row: &Row<'_>, index: usize) -> rusqlite::Result<Address> {
    let blob: Vec<u8> = row.get(index)?;
    Address::try_from(blob.as_slice()).map_err(|_| blob_width(index, blob.len(), 20))
}

fn read_optional_address(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<Address>> {
    let blob: Option<Vec<u8>> = row.get(index)?;
    blob.map(|blob| {
        Address::try_from(blob.as_slice()).map_err(|_| blob_width(index, blob.len(), 20))
    })
    .transpose()
}

fn blob_width(index: usize, len: usize, width: usize) -> rusqlite::Error {
    let source = Box::new(RowWidthError { len, width });
    rusqlite::Error::FromSqlConversionFailure(index, Type::Blob, source)
}

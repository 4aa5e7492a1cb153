//! Error types for the event store.

use thiserror::Error;

/// Failures surfaced by the event store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An underlying SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// The database file location could not be prepared.
    #[error("failed to prepare database location: {0}")]
    Location(#[from] std::io::Error),
    /// No ledger entry exists with the given identifier.
    #[error("query ledger entry {0} not found")]
    EntryNotFound(i64),
    /// The connection lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,
}

/// Whether an error is SQLite complaining about an absent table.
///
/// A database that never saw a write has no tables. Reads treat that the
/// same as an empty table instead of failing.
pub(crate) fn is_missing_table(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(_, Some(message)) if message.starts_with("no such table")
    )
}

/// A stored blob does not have the width its column requires.
#[derive(Debug, Error)]
#[error("stored blob is {len} bytes, expected {width}")]
pub(crate) struct RowWidthError {
    pub(crate) len: usize,
    pub(crate) width: usize,
}

/// A stored query-kind bitmask disagrees with the stored filter columns.
#[derive(Debug, Error)]
#[error("stored query kind {stored:#04x} does not describe its filter columns ({derived:#04x})")]
pub(crate) struct RowKindError {
    pub(crate) stored: u8,
    pub(crate) derived: u8,
}

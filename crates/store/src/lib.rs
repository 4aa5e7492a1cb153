//! SQLite-backed persistence for the almanac event cache.
//!
//! Two tables carry the whole design. `events` stores every event the
//! cache has ever seen, keyed so replays overwrite instead of duplicate.
//! `event_queries` is the coverage ledger: a record of which constraint
//! sets have been fully fetched over which block ranges, which is what
//! lets the cache answer later requests without repeating node work.

#![doc(issue_tracker_base_url = "https://github.com/almanac-rs/almanac/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::StorageError;

mod schema;

mod select;
pub use select::{BoundMode, EventSelection, LedgerSelection, StoredEventQuery};

mod store;
pub use store::{EventStore, StoreStats};

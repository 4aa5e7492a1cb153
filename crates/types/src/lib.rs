//! Core domain types for the almanac event-log cache.
//!
//! This crate is purely computational. It defines the canonical event
//! representation, block-range arithmetic, filter and query types, the
//! confirmation gate, and the coverage algebra that the fetching and
//! storage layers are built on. Nothing in here performs I/O.

#![doc(issue_tracker_base_url = "https://github.com/almanac-rs/almanac/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod chunk;
pub use chunk::{BlockRange, RangeError, split_range};

mod event;
pub use event::{EncodedEvent, EventConversionError};

mod filter;
pub use filter::{EventFilter, QueryKind};

mod query;
pub use query::EventQuery;

mod gate;
pub use gate::{GatedBatch, confirmed_head, gate_batch};

mod coverage;
pub use coverage::{merge_ranges, uncovered_ranges};

mod format;
pub use format::{
    BinaryFormat, BinaryValue, ColumnValue, EventColumn, EventRow, FormatError, RowFormat,
};

mod block_ref;
pub use block_ref::{BlockRef, BlockRefParseError};

//! Cache coordination for Ethereum event logs.
//!
//! [`EventScribe`] is the public entry point of the engine. It answers
//! event requests by consulting the coverage ledger, serving covered block
//! ranges from the local store, fetching only the gaps from the node, and
//! persisting whatever the confirmation gate lets through.

#![doc(issue_tracker_base_url = "https://github.com/almanac-rs/almanac/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod abi;
pub use abi::DecodedEvent;

mod config;
pub use config::{CachePolicy, DEFAULT_REQUIRED_CONFIRMATIONS, NetworkTag, ScribeConfig};

mod error;
pub use error::ScribeError;

mod metrics;

mod page;
pub use page::EventPage;

mod request;
pub use request::{EventRequest, EventSpec};

mod scribe;
pub use scribe::EventScribe;

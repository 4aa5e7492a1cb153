//! Table and JSON rendering for CLI output.

use almanac_cache::{DecodedEvent, EventPage};
use almanac_store::{StoreStats, StoredEventQuery};
use almanac_types::{BinaryFormat, RowFormat};
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{B256, hex};
use serde_json::{Value, json};
use tabled::{
    Tabled,
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

/// `--binary-format` and `--topic-format` choices.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Raw bytes, printed the way byte strings display.
    Raw,
    /// `0x`-prefixed lowercase hex.
    #[default]
    PrefixHex,
}

impl From<FormatArg> for BinaryFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Raw => Self::Raw,
            FormatArg::PrefixHex => Self::PrefixHex,
        }
    }
}

/// Prints a page of events as a table, one row per event, followed by a
/// one-line summary of where the rows came from.
pub fn print_page(page: &EventPage, format: &RowFormat) {
    if !page.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(page_headers(page, format));
        for (position, event) in page.events.iter().enumerate() {
            let mut cells: Vec<String> =
                event.to_row(format).into_iter().map(|(_, value)| value.to_string()).collect();
            if page.timestamps.is_some() {
                let cell = page.timestamp_of(event.block_number);
                cells.push(cell.map_or_else(String::new, |ts| ts.to_string()));
            }
            if let Some(decoded) = &page.decoded {
                cells.push(format_decoded(&decoded[position]));
            }
            builder.push_record(cells);
        }
        let mut table = builder.build();
        table.with(Style::modern());
        table.modify(Columns::first(), Alignment::right());
        println!("{}", table);
    }
    println!(
        "{} events in blocks {} ({} cached, {} fetched, {} persisted)",
        page.len(),
        page.range,
        page.from_store,
        page.from_node,
        page.persisted
    );
}

/// The page as one JSON document, counters included.
pub fn page_to_json(page: &EventPage, format: &RowFormat) -> Value {
    let events: Vec<Value> = page
        .events
        .iter()
        .enumerate()
        .map(|(position, event)| {
            let mut fields = serde_json::Map::new();
            for (column, value) in event.to_row(format) {
                let cell = serde_json::to_value(&value).unwrap_or(Value::Null);
                fields.insert(column.name().to_string(), cell);
            }
            if let Some(ts) = page.timestamp_of(event.block_number) {
                fields.insert("timestamp".to_string(), json!(ts));
            }
            if let Some(decoded) = &page.decoded {
                fields.insert("decoded".to_string(), decoded_to_json(&decoded[position]));
            }
            Value::Object(fields)
        })
        .collect();
    json!({
        "range": { "start": page.range.start(), "end": page.range.end() },
        "from_store": page.from_store,
        "from_node": page.from_node,
        "persisted": page.persisted,
        "events": events,
    })
}

/// Prints ledger entries as a table with a store summary line.
pub fn print_coverage(entries: &[StoredEventQuery], stats: StoreStats) {
    if entries.is_empty() {
        println!("no coverage recorded");
    } else {
        let mut table = tabled::Table::new(entries.iter().map(CoverageRow::from));
        table.with(Style::modern());
        table.modify(Columns::first(), Alignment::right());
        println!("{}", table);
    }
    println!("store holds {} events across {} coverage entries", stats.events, stats.queries);
}

/// Ledger entries and store counts as one JSON document.
pub fn coverage_to_json(entries: &[StoredEventQuery], stats: StoreStats) -> Value {
    let entries: Vec<Value> = entries
        .iter()
        .map(|entry| {
            let filter = &entry.query.filter;
            json!({
                "id": entry.id,
                "kind": filter.kind().bits(),
                "address": filter.contract_address.map(|address| address.to_string()),
                "topics": filter.topics.iter().map(|topic| topic.map(|t| t.to_string()))
                    .collect::<Vec<_>>(),
                "start_block": entry.query.range.start(),
                "end_block": entry.query.range.end(),
            })
        })
        .collect();
    json!({
        "entries": entries,
        "events": stats.events,
        "queries": stats.queries,
    })
}

/// Renders a decoded value the way it would appear in Solidity source:
/// quotesless strings, `0x` hex for byte types, brackets for arrays.
pub fn format_sol_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Address(value) => value.to_string(),
        DynSolValue::Bool(value) => value.to_string(),
        DynSolValue::Uint(value, _) => value.to_string(),
        DynSolValue::Int(value, _) => value.to_string(),
        DynSolValue::FixedBytes(word, size) => hex::encode_prefixed(&word[..*size]),
        DynSolValue::Bytes(bytes) => hex::encode_prefixed(bytes),
        DynSolValue::String(value) => value.clone(),
        DynSolValue::Array(values) | DynSolValue::FixedArray(values) => {
            format!("[{}]", join_values(values))
        }
        DynSolValue::Tuple(values) => format!("({})", join_values(values)),
        other => format!("{other:?}"),
    }
}

fn join_values(values: &[DynSolValue]) -> String {
    values.iter().map(format_sol_value).collect::<Vec<_>>().join(", ")
}

/// One `Name(param: value, ...)` cell for a decoded row.
fn format_decoded(decoded: &DecodedEvent) -> String {
    let params = decoded
        .params
        .iter()
        .map(|(name, value)| format!("{name}: {}", format_sol_value(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({params})", decoded.name)
}

fn decoded_to_json(decoded: &DecodedEvent) -> Value {
    let params: Vec<Value> = decoded
        .params
        .iter()
        .map(|(name, value)| json!({ "name": name, "value": format_sol_value(value) }))
        .collect();
    json!({ "name": decoded.name, "params": params })
}

fn page_headers(page: &EventPage, format: &RowFormat) -> Vec<String> {
    let mut headers: Vec<String> =
        format.columns().iter().map(|column| column.name().to_string()).collect();
    if page.timestamps.is_some() {
        headers.push("timestamp".to_string());
    }
    if page.decoded.is_some() {
        headers.push("decoded".to_string());
    }
    headers
}

/// One ledger entry as table cells.
#[derive(Tabled)]
struct CoverageRow {
    id: i64,
    kind: String,
    address: String,
    topics: String,
    blocks: String,
}

impl From<&StoredEventQuery> for CoverageRow {
    fn from(entry: &StoredEventQuery) -> Self {
        let filter = &entry.query.filter;
        let topics = filter
            .topics
            .iter()
            .enumerate()
            .filter_map(|(i, topic)| topic.map(|t| format!("t{i}={}", short_hex(t))))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            id: entry.id,
            kind: filter.kind().to_string(),
            address: filter.contract_address.map_or_else(String::new, |a| a.to_string()),
            topics,
            blocks: entry.query.range.to_string(),
        }
    }
}

/// Shortens a 32-byte word to `0x1234..cdef` for table cells.
fn short_hex(word: B256) -> String {
    let full = word.to_string();
    format!("{}..{}", &full[..6], &full[full.len() - 4..])
}

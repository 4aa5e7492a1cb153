//! Logs Subcommand

use crate::{
    flags::{CacheArgs, FilterArgs, GlobalArgs},
    render::{self, FormatArg},
};
use almanac_cache::{EventRequest, EventScribe, ScribeConfig};
use almanac_provider::HttpChainClient;
use almanac_store::EventStore;
use almanac_types::{BlockRef, EventColumn, RowFormat};
use clap::Parser;
use std::sync::Arc;
use tracing::debug;

/// The `logs` Subcommand
///
/// Fetches event logs over a block range. Ranges the cache has already
/// recorded as complete are served from disk; only the gaps hit the node,
/// and confirmed results are persisted for next time.
///
/// # Usage
///
/// ```sh
/// almanac logs [FLAGS] [OPTIONS]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Fetches event logs over a block range, serving cached spans from disk")]
pub struct LogsCommand {
    /// First block of the range.
    #[arg(
        long,
        default_value = "0",
        help = "First block: a number, `latest`, or `@<unix-seconds>`"
    )]
    pub from: BlockRef,
    /// Last block of the range.
    #[arg(
        long,
        default_value = "latest",
        help = "Last block: a number, `latest`, or `@<unix-seconds>`"
    )]
    pub to: BlockRef,
    /// Event constraints.
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Cache policy and fetch tuning.
    #[command(flatten)]
    pub cache: CacheArgs,
    /// Decode rows against the event signature into named parameters.
    #[arg(long, requires = "event", help = "Decode rows against the --event signature")]
    pub decode: bool,
    /// Attach block timestamps for every block carrying a row.
    #[arg(long, help = "Attach block timestamps")]
    pub timestamps: bool,
    /// Columns to print. Defaults to every column.
    #[arg(long, value_delimiter = ',', help = "Comma-separated columns to print")]
    pub columns: Option<Vec<EventColumn>>,
    /// Rendering of binary columns.
    #[arg(long, value_enum, default_value = "prefix-hex", help = "Rendering of binary columns")]
    pub binary_format: FormatArg,
    /// Rendering of the signature hash and topic columns.
    #[arg(long, value_enum, default_value = "prefix-hex", help = "Rendering of topic columns")]
    pub topic_format: FormatArg,
    /// Emit machine-readable JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl LogsCommand {
    /// Runs the subcommand.
    pub async fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let db = args.db_path()?;
        debug!(target: "almanac_cli", db = %db.display(), "Opening cache");
        let client = Arc::new(HttpChainClient::new_http(args.rpc_url()?));
        let store = EventStore::open(db)?;
        let config = ScribeConfig { network: args.network(), policy: self.cache.policy() };
        let scribe = EventScribe::new(client, store, config);

        let page = scribe.events(&self.request()).await?;

        let format = RowFormat {
            columns: self.columns.clone(),
            binary: self.binary_format.into(),
            topics: self.topic_format.into(),
        };
        if self.json {
            let doc = render::page_to_json(&page, &format);
            println!("{}", serde_json::to_string_pretty(&doc)?);
        } else {
            render::print_page(&page, &format);
        }
        Ok(())
    }

    /// The event request these flags describe.
    fn request(&self) -> EventRequest {
        EventRequest {
            filter: self.filter.filter(),
            event: self.filter.event_spec(),
            start: self.from,
            end: self.to,
            decode: self.decode,
            timestamps: self.timestamps,
        }
    }
}

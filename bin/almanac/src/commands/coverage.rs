//! Coverage Subcommand

use crate::{
    flags::{FilterArgs, GlobalArgs},
    render,
};
use almanac_store::{EventStore, LedgerSelection};
use almanac_types::BlockRange;
use clap::Parser;

/// The `coverage` Subcommand
///
/// Lists the coverage ledger: which block ranges the local cache has recorded
/// as completely fetched for which filters. Works entirely against the local
/// database; no node is contacted.
///
/// # Usage
///
/// ```sh
/// almanac coverage [FLAGS] [OPTIONS]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Lists the block ranges the local cache has recorded as complete")]
pub struct CoverageCommand {
    /// Event constraints selecting the ledger entries to list.
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Only list entries overlapping blocks at or above this height.
    #[arg(long, requires = "to", help = "Lower block bound; requires --to")]
    pub from: Option<u64>,
    /// Only list entries overlapping blocks at or below this height.
    #[arg(long, requires = "from", help = "Upper block bound; requires --from")]
    pub to: Option<u64>,
    /// Emit machine-readable JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl CoverageCommand {
    /// Runs the subcommand.
    pub fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let store = EventStore::open(args.db_path()?)?;
        let entries = store.select_queries(&self.selection()?)?;
        let stats = store.stats()?;
        if self.json {
            let doc = render::coverage_to_json(&entries, stats);
            println!("{}", serde_json::to_string_pretty(&doc)?);
        } else {
            render::print_coverage(&entries, stats);
        }
        Ok(())
    }

    /// The ledger selection the flags describe.
    ///
    /// Without filter flags every entry is listed, whatever fields it
    /// constrained; with them the listing is pinned to entries recording
    /// exactly that filter.
    fn selection(&self) -> anyhow::Result<LedgerSelection> {
        let filter = self.filter.resolved_filter()?;
        Ok(match (filter.is_unconstrained(), self.range()?) {
            (true, None) => LedgerSelection::any(),
            (true, Some(range)) => LedgerSelection::any_overlapping(range),
            (false, None) => LedgerSelection::all_ranges(filter),
            (false, Some(range)) => LedgerSelection::overlapping(filter, range),
        })
    }

    /// The block bound, when both ends are given.
    fn range(&self) -> anyhow::Result<Option<BlockRange>> {
        match (self.from, self.to) {
            (Some(start), Some(end)) => Ok(Some(BlockRange::new(start, end)?)),
            _ => Ok(None),
        }
    }
}

//! Forget Subcommand

use crate::flags::{FilterArgs, GlobalArgs};
use almanac_store::{EventStore, LedgerSelection};
use almanac_types::BlockRange;
use anyhow::bail;
use clap::Parser;
use tracing::debug;

/// The `forget` Subcommand
///
/// Removes coverage ledger entries, either by id or by filter match. Cached
/// event rows stay in place; only the claim that a range is complete goes
/// away, so the next overlapping request fetches those blocks again.
///
/// # Usage
///
/// ```sh
/// almanac forget [IDS]... [OPTIONS]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Removes coverage ledger entries from the local cache")]
pub struct ForgetCommand {
    /// Ledger entry identifiers to remove.
    #[arg(value_name = "ID", conflicts_with = "matching")]
    pub ids: Vec<i64>,
    /// Remove every entry matching the filter flags instead of naming ids.
    #[arg(long, help = "Remove entries by filter match instead of by id")]
    pub matching: bool,
    /// Event constraints selecting the entries to remove.
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Only entries overlapping blocks at or above this height.
    #[arg(long, requires = "matching", help = "Lower block bound; requires --matching")]
    pub from: Option<u64>,
    /// Only entries overlapping blocks at or below this height.
    #[arg(long, requires = "matching", help = "Upper block bound; requires --matching")]
    pub to: Option<u64>,
}

impl ForgetCommand {
    /// Runs the subcommand.
    pub fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let store = EventStore::open(args.db_path()?)?;
        if self.matching {
            let filter = self.filter.resolved_filter()?;
            let selection = match self.range()? {
                Some(range) => LedgerSelection::overlapping(filter, range),
                None => LedgerSelection::all_ranges(filter),
            };
            let removed = store.delete_queries(&selection)?;
            debug!(target: "almanac_cli", removed, "Removed ledger entries by filter");
            println!("forgot {removed} coverage entries");
            return Ok(());
        }
        if self.ids.is_empty() {
            bail!("name at least one ledger id, or pass --matching with filter flags");
        }
        for id in &self.ids {
            let query = store.delete_query(*id)?;
            println!("forgot {id}: blocks {}", query.range);
        }
        Ok(())
    }

    /// The block bound, when both ends are given.
    fn range(&self) -> anyhow::Result<Option<BlockRange>> {
        match (self.from, self.to) {
            (Some(start), Some(end)) => Ok(Some(BlockRange::new(start, end)?)),
            (None, None) => Ok(None),
            _ => bail!("block bounds come in pairs; pass both --from and --to"),
        }
    }
}

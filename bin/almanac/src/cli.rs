//! Contains the almanac CLI.

use crate::{
    commands::{CoverageCommand, ForgetCommand, HeadCommand, LogsCommand},
    flags::GlobalArgs,
};
use anyhow::Result;
use clap::{Parser, Subcommand};

/// The almanac CLI.
///
/// Every subcommand shares the global flags: the RPC endpoint, the network
/// tag that names the cache database, and the verbosity switches.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Cached retrieval of Ethereum event logs", long_about = None)]
pub struct Cli {
    /// Global arguments for the CLI.
    #[command(flatten)]
    pub global: GlobalArgs,
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands of the almanac CLI.
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Fetch event logs over a block range, serving cached spans from disk.
    Logs(LogsCommand),
    /// Print the latest block number of the configured node.
    Head(HeadCommand),
    /// List the block ranges the local cache has recorded as complete.
    Coverage(CoverageCommand),
    /// Remove coverage ledger entries from the local cache.
    Forget(ForgetCommand),
}

impl Cli {
    /// Runs the parsed command.
    pub fn run(self) -> Result<()> {
        self.global.init_telemetry()?;
        match self.command {
            Commands::Logs(cmd) => Self::block_on(cmd.run(&self.global)),
            Commands::Head(cmd) => Self::block_on(cmd.run(&self.global)),
            Commands::Coverage(cmd) => cmd.run(&self.global),
            Commands::Forget(cmd) => cmd.run(&self.global),
        }
    }

    /// Drives an async subcommand to completion.
    fn block_on<F>(fut: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        let rt = Self::tokio_runtime()?;
        rt.block_on(fut)
    }

    /// Creates a new default tokio multi-thread [`Runtime`](tokio::runtime::Runtime)
    /// with all features enabled.
    fn tokio_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    }
}

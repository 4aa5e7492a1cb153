//! Head Subcommand

use crate::flags::GlobalArgs;
use almanac_provider::{ChainClient, HttpChainClient};
use clap::Parser;

/// The `head` Subcommand
///
/// Prints the latest block number the configured node knows about.
///
/// # Usage
///
/// ```sh
/// almanac head [FLAGS]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Prints the latest block number of the configured node")]
pub struct HeadCommand {}

impl HeadCommand {
    /// Runs the subcommand.
    pub async fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let client = HttpChainClient::new_http(args.rpc_url()?);
        let head = client.latest_block_number().await?;
        println!("{head}");
        Ok(())
    }
}

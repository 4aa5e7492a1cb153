//! Global arguments for the CLI.

use almanac_cache::NetworkTag;
use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Global arguments for the CLI.
#[derive(Parser, Default, Clone, Debug)]
pub struct GlobalArgs {
    /// Verbosity level.
    #[arg(
        long = "verbose",
        short = 'v',
        global = true,
        action = clap::ArgAction::Count,
        help = "Verbosity level (-v debug, -vv trace)"
    )]
    pub v: u8,
    /// The JSON-RPC endpoint of the node to fetch from.
    #[arg(
        long,
        global = true,
        env = "ALMANAC_RPC_URL",
        help = "URL of the Ethereum JSON-RPC endpoint"
    )]
    pub rpc_url: Option<Url>,
    /// The network tag naming the cache file.
    #[arg(
        long,
        short = 'n',
        global = true,
        default_value = "mainnet",
        env = "ALMANAC_NETWORK",
        help = "Network tag; each tag gets its own cache database"
    )]
    pub network: String,
    /// Overrides the cache database location.
    #[arg(
        long,
        global = true,
        env = "ALMANAC_DB",
        help = "Path to the cache database (defaults to <data-dir>/almanac/<network>.db)"
    )]
    pub db: Option<PathBuf>,
}

impl GlobalArgs {
    /// The configured RPC endpoint.
    pub fn rpc_url(&self) -> Result<Url> {
        self.rpc_url.clone().ok_or_else(|| {
            anyhow!("no RPC endpoint configured; pass --rpc-url or set ALMANAC_RPC_URL")
        })
    }

    /// The network tag for this invocation.
    pub fn network(&self) -> NetworkTag {
        NetworkTag::new(self.network.as_str())
    }

    /// Where the cache database lives.
    ///
    /// Defaults to one file per network under the platform data directory,
    /// so caches for different chains never mix.
    pub fn db_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.db {
            return Ok(path.clone());
        }
        let base = dirs::data_dir()
            .ok_or_else(|| anyhow!("no user data directory on this platform; pass --db"))?;
        Ok(base.join("almanac").join(format!("{}.db", self.network)))
    }

    /// Initializes the tracing subscriber from the verbosity flags.
    ///
    /// A `RUST_LOG` environment filter wins over the flags when set.
    pub fn init_telemetry(&self) -> Result<()> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level(self.v)));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|err| anyhow!("failed to install the tracing subscriber: {err}"))
    }
}

/// The default filter directive for a verbosity count.
const fn level(v: u8) -> &'static str {
    match v {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_quiet_mainnet() {
        let args = GlobalArgs::try_parse_from(["almanac"]).unwrap();
        assert_eq!(args.v, 0);
        assert_eq!(args.network, "mainnet");
        assert!(args.rpc_url.is_none());
        assert!(args.db.is_none());
    }

    #[test]
    fn verbosity_counts_repeats() {
        let args = GlobalArgs::try_parse_from(["almanac", "-vv"]).unwrap();
        assert_eq!(args.v, 2);
        assert_eq!(level(args.v), "trace");
    }

    #[test]
    fn missing_rpc_url_is_an_error() {
        let args = GlobalArgs::try_parse_from(["almanac"]).unwrap();
        assert!(args.rpc_url().is_err());

        let args =
            GlobalArgs::try_parse_from(["almanac", "--rpc-url", "http://localhost:8545"]).unwrap();
        assert_eq!(args.rpc_url().unwrap().as_str(), "http://localhost:8545/");
    }

    #[test]
    fn db_override_wins_over_the_derived_path() {
        let args = GlobalArgs::try_parse_from(["almanac", "--db", "/tmp/custom.db"]).unwrap();
        assert_eq!(args.db_path().unwrap(), PathBuf::from("/tmp/custom.db"));
    }

    #[test]
    fn default_db_path_is_segregated_by_network() {
        let args = GlobalArgs::try_parse_from(["almanac", "--network", "sepolia"]).unwrap();
        let path = args.db_path().unwrap();
        assert!(path.ends_with("almanac/sepolia.db"), "unexpected path {}", path.display());
        assert_eq!(args.network().as_str(), "sepolia");
    }
}

//! The almanac CLI entry point.

use clap::Parser;

mod cli;
mod commands;
mod flags;
mod render;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}

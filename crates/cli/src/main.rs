#![warn(clippy::all, clippy::pedantic)]

mod commands;
mod config;

use anyhow::Result;

use clap::Parser;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::commands::Commands;
use crate::config::{ChainArgs, CliConfig};

/// Command-line entrypoint for the Glittr wallet CLI.
#[derive(Parser, Debug)]
#[command(
    name = "glittr-cli",
    version,
    about = "Glittr asset wallet CLI: balances, tokens, NFTs and transfers"
)]
struct Cli {
    #[command(flatten)]
    chain: ChainArgs,
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    logging_init();

    let parsed = Cli::parse();

    let config = CliConfig::from_args(&parsed.chain);

    parsed.command.handle(config).await
}

fn logging_init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

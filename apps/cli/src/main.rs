//! Enricher CLI: turn lists of company domains into stored company records.
//!
//! Fetches each homepage, resolves name, URL, description and Twitter handle
//! from its metadata, and persists one record per domain.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

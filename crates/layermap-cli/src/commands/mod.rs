//! Command implementations

mod config;
mod datasets;
mod load;
mod normalize;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Datasets(args) => datasets::execute(&cli, args, &config, &output).await,
        Commands::Normalize(args) => normalize::execute(args, &config, &output).await,
        Commands::Load(args) => load::execute(&cli, args, &config, &output).await,
        Commands::Config => config::execute(&config, &output),
    }
}

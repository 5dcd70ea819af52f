//! Configuration loading for CLI commands

use anyhow::{Context, Result};
use layermap_core::config::{CliConfigOverrides, LayeredConfig};
use layermap_core::ports::DatasetSource;
use layermap_source::{DirectorySource, HttpSource};
use std::sync::Arc;

use crate::cli::{Cli, SourceBackend};

/// Defaults, then the config file, then `LAYERMAP_*` variables, then flags
pub fn load_config(cli: &Cli) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();
    if let Some(path) = &cli.config {
        config = config
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    }
    let mut config = config.load_from_env();

    config.update_from_cli(CliConfigOverrides {
        api_base_url: cli.api_url.clone(),
        data_dir: cli.data_dir.clone(),
        source_projection: cli.source_projection.clone(),
        yield_delay_ms: cli.yield_delay_ms,
        max_zoom: cli.max_zoom,
    })
    .context("Invalid command-line configuration")?;
    Ok(config)
}

/// The dataset source selected on the command line
pub fn build_source(cli: &Cli, config: &LayeredConfig) -> Arc<dyn DatasetSource> {
    match cli.source {
        SourceBackend::Directory => Arc::new(DirectorySource::new(config.data_dir.value.clone())),
        SourceBackend::Http => Arc::new(HttpSource::new(config.api_base_url.value.clone())),
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Layermap - Projection-aware, clustered map layer pipeline
#[derive(Parser, Debug)]
#[command(name = "layermap")]
#[command(about = "Projection-aware, clustered map layer pipeline", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Where datasets are read from
    #[arg(long, global = true, default_value = "directory")]
    pub source: SourceBackend,

    /// Root of the GeoJSON tree (directory source)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the file provider (http source)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// PROJ.4 string of the source projection; empty disables exact transforms
    #[arg(long, global = true, value_name = "PROJ")]
    pub source_projection: Option<String>,

    /// Suspension between batch chunks in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub yield_delay_ms: Option<u64>,

    /// Maximum zoom level of the map
    #[arg(long, global = true, value_parser = parse_zoom_arg)]
    pub max_zoom: Option<u8>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Dataset source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceBackend {
    /// Pre-converted GeoJSON files on disk (default)
    Directory,
    /// The HTTP file provider
    Http,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the datasets of a category
    Datasets(DatasetsArgs),

    /// Reproject a GeoJSON file to longitude/latitude
    Normalize(NormalizeArgs),

    /// Load layers headlessly and report their render groups
    Load(LoadArgs),

    /// Show the effective configuration and where each value came from
    Config,
}

#[derive(Parser, Debug)]
pub struct DatasetsArgs {
    /// Category slug (e.g., admin, poi)
    pub category: String,

    /// Also summarize an aggregate point endpoint (e.g., combined)
    #[arg(long, value_name = "ENDPOINT")]
    pub points: Option<String>,
}

#[derive(Parser, Debug)]
pub struct NormalizeArgs {
    /// GeoJSON file to read
    pub input: PathBuf,

    /// Where to write the result (defaults to stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Skip the exact transform and use the linear approximation only
    #[arg(long)]
    pub linear_only: bool,
}

#[derive(Parser, Debug)]
pub struct LoadArgs {
    /// Show every dataset of these categories
    #[arg(long = "category", value_name = "CATEGORY")]
    pub categories: Vec<String>,

    /// Show these datasets
    #[arg(long = "dataset", value_name = "ID")]
    pub datasets: Vec<String>,

    /// Register and show the datasets of an aggregate point endpoint
    #[arg(long, value_name = "ENDPOINT")]
    pub points: Option<String>,

    /// Dataset registry file (TOML with [[datasets]] entries)
    #[arg(long, value_name = "FILE")]
    pub registry: Option<PathBuf>,

    /// Zoom level for the cluster report
    #[arg(long, default_value = "6", value_parser = parse_zoom_arg)]
    pub zoom: u8,
}

fn parse_zoom_arg(s: &str) -> Result<u8, String> {
    layermap_core::config::parse_zoom(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_load_args() {
        let cli = Cli::parse_from([
            "layermap",
            "load",
            "--category",
            "poi",
            "--category",
            "admin",
            "--points",
            "combined",
            "--zoom",
            "8",
        ]);
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.categories, vec!["poi", "admin"]);
                assert_eq!(args.points.as_deref(), Some("combined"));
                assert_eq!(args.zoom, 8);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_zoom() {
        assert!(Cli::try_parse_from(["layermap", "--max-zoom", "40", "config"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["layermap", "datasets", "admin", "--json", "--source", "http"]);
        assert!(cli.json);
        assert_eq!(cli.source, SourceBackend::Http);
    }
}

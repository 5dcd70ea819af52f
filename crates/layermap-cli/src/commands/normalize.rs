//! Normalize command implementation

use crate::cli::NormalizeArgs;
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use layermap_core::config::LayeredConfig;
use layermap_core::models::{parse_feature_collection, to_feature_collection};
use layermap_geo::{CoordinateNormalizer, LinearApproximation, NormalizeReport};
use serde::Serialize;

#[derive(Serialize)]
struct NormalizeOutput {
    input: String,
    output: Option<String>,
    features: usize,
    exact_transform: bool,
    report: NormalizeReport,
}

pub async fn execute(
    args: &NormalizeArgs,
    config: &LayeredConfig,
    output: &OutputWriter,
) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let mut features = parse_feature_collection(&content)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    let normalizer = if args.linear_only {
        CoordinateNormalizer::new(LinearApproximation::new(config.linear_approximation.value))
    } else {
        CoordinateNormalizer::from_config(config).context("Invalid source projection")?
    };
    let report = normalizer.normalize_features(&mut features);

    if report.degraded > 0 {
        output.warning(format!(
            "{} features could not be reprojected and kept their coordinates",
            report.degraded
        ));
    }

    let collection = serde_json::to_string_pretty(&to_feature_collection(&features))?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, collection)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        // The collection itself is the output
        None => {
            println!("{}", collection);
            return Ok(());
        }
    }

    if output.is_json() {
        return output.result(NormalizeOutput {
            input: args.input.display().to_string(),
            output: args.output.as_ref().map(|p| p.display().to_string()),
            features: features.len(),
            exact_transform: normalizer.has_exact(),
            report,
        });
    }

    output.success(format!(
        "Normalized {} features from {}",
        features.len(),
        args.input.display()
    ));
    output.kv("Unchanged", report.unchanged);
    output.kv("Exact", report.exact);
    output.kv("Approximated", report.approximated);
    output.kv("Degraded", report.degraded);
    output.kv("Skipped", report.skipped);
    Ok(())
}

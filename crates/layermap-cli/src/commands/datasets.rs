//! Datasets command implementation

use crate::cli::{Cli, DatasetsArgs};
use crate::config_loader::build_source;
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use layermap_core::config::LayeredConfig;
use layermap_core::models::Category;
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct DatasetRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Display Name")]
    display_name: String,
    #[tabled(rename = "Admin Level")]
    admin_level: String,
    #[tabled(rename = "Type")]
    kind: String,
}

#[derive(Tabled, Serialize)]
struct BreakdownRow {
    #[tabled(rename = "Dataset")]
    dataset: String,
    #[tabled(rename = "Points")]
    points: usize,
}

#[derive(Serialize)]
struct DatasetsOutput {
    category: String,
    datasets: Vec<DatasetRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    points: Option<Vec<BreakdownRow>>,
}

pub async fn execute(
    cli: &Cli,
    args: &DatasetsArgs,
    config: &LayeredConfig,
    output: &OutputWriter,
) -> Result<()> {
    let source = build_source(cli, config);
    let category = Category::new(args.category.clone());

    let descriptors = source
        .list_datasets(&category)
        .await
        .with_context(|| format!("Failed to list datasets for category '{}'", category))?;

    let rows: Vec<DatasetRow> = descriptors
        .into_iter()
        .map(|d| DatasetRow {
            name: d.name,
            display_name: d.display_name,
            admin_level: d.admin_level.unwrap_or_else(|| "-".to_string()),
            kind: d.kind,
        })
        .collect();

    let breakdown = match &args.points {
        Some(endpoint) => {
            let points = source
                .fetch_points(endpoint)
                .await
                .with_context(|| format!("Failed to fetch point collection '{}'", endpoint))?;
            Some(
                points
                    .breakdown()
                    .into_iter()
                    .map(|(dataset, points)| BreakdownRow { dataset, points })
                    .collect::<Vec<_>>(),
            )
        }
        None => None,
    };

    if output.is_json() {
        return output.result(DatasetsOutput {
            category: category.to_string(),
            datasets: rows,
            points: breakdown,
        });
    }

    output.section(format!("Datasets in '{}'", category));
    let count = rows.len();
    output.table(rows);
    output.kv("Total", count);

    if let (Some(endpoint), Some(breakdown)) = (&args.points, breakdown) {
        output.section(format!("Point datasets in '{}'", endpoint));
        output.table(breakdown);
    }
    Ok(())
}

//! Load command implementation

use crate::cli::{Cli, LoadArgs};
use crate::config_loader::build_source;
use crate::output::OutputWriter;
use crate::progress::{create_multi_progress, create_progress_bar, finish_error, finish_success};
use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use layermap_core::config::LayeredConfig;
use layermap_core::models::{Category, DatasetId};
use layermap_core::registry::DatasetRegistry;
use layermap_geo::CoordinateNormalizer;
use layermap_layers::{
    DatasetState, LayerOrchestrator, LayerStatus, OrchestratorSettings, ToggleEvent,
};
use layermap_render::{RenderItem, SizeBucket};
use serde::Serialize;
use std::collections::HashMap;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct LayerRow {
    #[tabled(rename = "Dataset")]
    dataset: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Render")]
    kind: String,
    #[tabled(rename = "Members")]
    members: usize,
    #[tabled(rename = "Chunks")]
    chunks: usize,
    #[tabled(rename = "Reprojected")]
    reprojected: usize,
}

#[derive(Tabled, Serialize)]
struct ClusterRow {
    #[tabled(rename = "Dataset")]
    dataset: String,
    #[tabled(rename = "Clusters")]
    clusters: usize,
    #[tabled(rename = "Single Markers")]
    singles: usize,
    #[tabled(rename = "Largest")]
    largest: usize,
    #[tabled(rename = "Small")]
    small: usize,
    #[tabled(rename = "Medium")]
    medium: usize,
    #[tabled(rename = "Large")]
    large: usize,
}

#[derive(Serialize)]
struct LoadOutput {
    zoom: u8,
    layers: Vec<LayerStatus>,
    clusters: Vec<ClusterRow>,
    errors: Vec<String>,
}

pub async fn execute(
    cli: &Cli,
    args: &LoadArgs,
    config: &LayeredConfig,
    output: &OutputWriter,
) -> Result<()> {
    if args.categories.is_empty() && args.datasets.is_empty() && args.points.is_none() {
        bail!("Nothing to load. Pass --category, --dataset or --points.");
    }

    let registry = match &args.registry {
        Some(path) => DatasetRegistry::load_from_file(path)
            .with_context(|| format!("Failed to load dataset registry {}", path.display()))?,
        None => DatasetRegistry::new(),
    };
    let normalizer =
        CoordinateNormalizer::from_config(config).context("Invalid source projection")?;
    let mut orchestrator = LayerOrchestrator::new(
        registry,
        build_source(cli, config),
        normalizer,
        OrchestratorSettings::from_config(config),
    );

    let mut events = Vec::new();
    for slug in &args.categories {
        let category = Category::new(slug.clone());
        orchestrator
            .discover(&category)
            .await
            .with_context(|| format!("Failed to list datasets for category '{}'", category))?;
        events.push(ToggleEvent::ShowAll(category));
    }
    if let Some(endpoint) = &args.points {
        orchestrator
            .discover_points(endpoint)
            .await
            .with_context(|| format!("Failed to fetch point collection '{}'", endpoint))?;
        events.push(ToggleEvent::ShowAll(Category::new(endpoint.clone())));
    }
    events.extend(args.datasets.iter().map(|id| ToggleEvent::Show(DatasetId::new(id.clone()))));

    for event in events {
        orchestrator.apply(event)?;
    }

    track_loads(&mut orchestrator, output.is_json()).await;

    let layers: Vec<LayerStatus> =
        orchestrator.statuses().into_iter().filter(|s| s.fetches > 0).collect();
    let clusters = cluster_report(&orchestrator, &layers, args.zoom);
    let errors: Vec<String> =
        orchestrator.status_log().errors().map(|m| m.text.clone()).collect();

    if output.is_json() {
        return output.result(LoadOutput { zoom: args.zoom, layers, clusters, errors });
    }

    for error in &errors {
        output.warning(error);
    }

    let loaded = layers.iter().filter(|s| s.state.is_loaded()).count();
    output.section("Layers");
    output.table(
        layers
            .iter()
            .map(|s| LayerRow {
                dataset: s.display_name.clone(),
                state: s.state.to_string(),
                kind: s.kind.map_or("-".to_string(), |k| format!("{:?}", k)),
                members: s.members,
                chunks: s.chunks,
                reprojected: s.normalize.map_or(0, |n| n.reprojected()),
            })
            .collect(),
    );

    output.section(format!("Clusters at zoom {}", args.zoom));
    output.table(clusters);

    output.success(format!(
        "Loaded {} of {} layers ({} icon descriptors cached)",
        loaded,
        layers.len(),
        orchestrator.marker_factory().cached_icons()
    ));
    Ok(())
}

/// Pump load events until every load has finished, drawing one bar per
/// dataset
async fn track_loads(orchestrator: &mut LayerOrchestrator, quiet: bool) {
    let multi = create_multi_progress();
    let mut bars: HashMap<DatasetId, ProgressBar> = HashMap::new();

    while let Some(status) = orchestrator.pump().await {
        if quiet {
            continue;
        }
        if !bars.contains_key(&status.dataset) {
            // A fetch failure never reports progress and gets no bar
            let Some(progress) = status.progress else {
                continue;
            };
            let bar = multi.add(create_progress_bar(progress.total as u64, &status.display_name));
            bars.insert(status.dataset.clone(), bar);
        }
        let Some(bar) = bars.get(&status.dataset) else {
            continue;
        };
        bar.set_position(status.members as u64);

        match status.state {
            DatasetState::Populated | DatasetState::Hidden => {
                finish_success(bar, &format!("{} ({} features)", status.display_name, status.members));
            }
            DatasetState::Failed => finish_error(bar, &status.display_name),
            _ => {}
        }
    }
}

fn cluster_report(orchestrator: &LayerOrchestrator, layers: &[LayerStatus], zoom: u8) -> Vec<ClusterRow> {
    layers
        .iter()
        .filter_map(|status| {
            let engine = orchestrator.group(&status.dataset)?.engine()?;
            let items = engine.items_at(zoom);
            let mut row = ClusterRow {
                dataset: status.display_name.clone(),
                clusters: 0,
                singles: 0,
                largest: 0,
                small: 0,
                medium: 0,
                large: 0,
            };
            for item in &items {
                match item {
                    RenderItem::Marker(_) => row.singles += 1,
                    RenderItem::Cluster(cluster) => {
                        row.clusters += 1;
                        row.largest = row.largest.max(cluster.count);
                        match cluster.glyph.bucket {
                            SizeBucket::Small => row.small += 1,
                            SizeBucket::Medium => row.medium += 1,
                            SizeBucket::Large => row.large += 1,
                        }
                    }
                }
            }
            Some(row)
        })
        .collect()
}

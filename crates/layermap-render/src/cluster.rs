//! Per-dataset marker clustering.
//!
//! Each [`ClusterEngine`] owns the markers of exactly one dataset and rejects
//! markers from any other, so no cluster can mix datasets. Clusters are
//! computed in web-mercator pixel space as a hierarchy: the level for zoom
//! `z` greedily merges the nodes of level `z + 1` that lie within
//! `max_cluster_radius` pixels of each other. From
//! `disable_clustering_at_zoom` upwards every marker renders on its own.
//!
//! The hierarchy is derived state. It is dropped whenever markers are added
//! and rebuilt on the next query.

use layermap_core::error::{LayermapError, Result};
use layermap_core::models::{Bounds, ClusterPolicy, DatasetConfig, DatasetId, FeatureId, Position};
use layermap_geo::mercator;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Serialize;
use std::f64::consts::PI;
use std::sync::OnceLock;

use crate::glyph::ClusterGlyph;
use crate::marker::Marker;
use crate::viewport::{Viewport, FIT_PADDING};

/// Pixel spacing between spiderfied markers along the circle
const SPIDER_FOOT_SEPARATION: f64 = 25.0;

/// Identity of a cluster within one hierarchy build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ClusterId {
    pub zoom: u8,
    pub index: usize,
}

/// A group of two or more markers at one zoom level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub dataset: DatasetId,
    pub count: usize,
    /// Mean member position, `[longitude, latitude]`
    pub center: Position,
    pub bounds: Bounds,
    /// Indices into the engine's markers
    pub members: Vec<usize>,
    pub glyph: ClusterGlyph,
}

/// What the viewport shows for one dataset at one zoom
#[derive(Debug)]
pub enum RenderItem<'a> {
    Marker(&'a Marker),
    Cluster(Cluster),
}

impl RenderItem<'_> {
    pub fn count(&self) -> usize {
        match self {
            RenderItem::Marker(_) => 1,
            RenderItem::Cluster(c) => c.count,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            RenderItem::Marker(m) => m.position,
            RenderItem::Cluster(c) => c.center,
        }
    }
}

/// One fanned-out member of a spiderfied cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpiderLeg {
    pub marker: usize,
    pub feature: FeatureId,
    /// Where the member is drawn
    pub position: Position,
    /// Where the member actually is
    pub origin: Position,
}

/// Result of clicking a cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClusterAction {
    /// Fit the viewport to the members
    ZoomToBounds { bounds: Bounds, zoom: u8 },
    /// Fan co-located members out around the cluster center
    Spiderfy { center: Position, legs: Vec<SpiderLeg> },
    /// Click handling disabled by policy
    Ignore,
}

#[derive(Debug, Clone)]
struct Node {
    center: Position,
    bounds: Bounds,
    members: Vec<usize>,
}

impl Node {
    fn leaf(index: usize, position: Position) -> Self {
        Self { center: position, bounds: Bounds::from_position(position), members: vec![index] }
    }

    fn merge(nodes: &[Node], group: &[usize]) -> Self {
        let first = &nodes[group[0]];
        let mut bounds = first.bounds;
        let mut members = Vec::new();
        let (mut sx, mut sy) = (0.0, 0.0);
        for &i in group {
            let node = &nodes[i];
            let weight = node.members.len() as f64;
            sx += node.center[0] * weight;
            sy += node.center[1] * weight;
            bounds = bounds.union(&node.bounds);
            members.extend_from_slice(&node.members);
        }
        members.sort_unstable();
        let n = members.len() as f64;
        Self { center: [sx / n, sy / n], bounds, members }
    }
}

#[derive(Debug)]
struct Hierarchy {
    /// `levels[z]` holds the nodes shown at zoom `z`
    levels: Vec<Vec<Node>>,
}

impl Hierarchy {
    fn build(markers: &[Marker], radius: f64, top: u8) -> Self {
        let mut current: Vec<Node> =
            markers.iter().enumerate().map(|(i, m)| Node::leaf(i, m.position)).collect();
        let mut levels = vec![Vec::new(); usize::from(top)];

        for zoom in (0..top).rev() {
            current = cluster_level(&current, zoom, radius);
            levels[usize::from(zoom)] = current.clone();
        }

        Self { levels }
    }
}

fn cluster_level(nodes: &[Node], zoom: u8, radius: f64) -> Vec<Node> {
    let z = f64::from(zoom);
    let pixels: Vec<Position> = nodes.iter().map(|n| mercator::project(n.center, z)).collect();
    let tree = RTree::bulk_load(
        pixels.iter().enumerate().map(|(i, p)| GeomWithData::new(*p, i)).collect(),
    );

    let mut taken = vec![false; nodes.len()];
    let mut merged = Vec::new();

    for i in 0..nodes.len() {
        if taken[i] {
            continue;
        }
        taken[i] = true;

        let mut group = vec![i];
        for neighbor in tree.locate_within_distance(pixels[i], radius * radius) {
            let j = neighbor.data;
            if !taken[j] {
                taken[j] = true;
                group.push(j);
            }
        }
        group[1..].sort_unstable();
        merged.push(Node::merge(nodes, &group));
    }

    merged
}

/// Cluster-capable render group for one dataset
#[derive(Debug)]
pub struct ClusterEngine {
    dataset: DatasetId,
    color: String,
    icon: String,
    policy: ClusterPolicy,
    max_zoom: u8,
    markers: Vec<Marker>,
    hierarchy: OnceLock<Hierarchy>,
}

impl ClusterEngine {
    pub fn new(config: &DatasetConfig, max_zoom: u8) -> Self {
        Self {
            dataset: config.id.clone(),
            color: config.color.clone(),
            icon: config.icon.clone(),
            policy: config.cluster_policy(),
            max_zoom,
            markers: Vec::new(),
            hierarchy: OnceLock::new(),
        }
    }

    pub fn dataset(&self) -> &DatasetId {
        &self.dataset
    }

    pub fn policy(&self) -> &ClusterPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Add one marker; markers of another dataset are rejected
    pub fn add_marker(&mut self, marker: Marker) -> Result<()> {
        self.check_dataset(&marker)?;
        self.markers.push(marker);
        self.hierarchy = OnceLock::new();
        Ok(())
    }

    /// Add a chunk of markers. Nothing is added if any belongs elsewhere.
    pub fn add_markers(&mut self, markers: Vec<Marker>) -> Result<usize> {
        for marker in &markers {
            self.check_dataset(marker)?;
        }
        let added = markers.len();
        self.markers.extend(markers);
        if added > 0 {
            self.hierarchy = OnceLock::new();
        }
        Ok(added)
    }

    /// Drop every marker
    pub fn clear(&mut self) {
        self.markers.clear();
        self.hierarchy = OnceLock::new();
    }

    fn check_dataset(&self, marker: &Marker) -> Result<()> {
        if marker.dataset != self.dataset {
            return Err(LayermapError::DatasetMismatch {
                expected: self.dataset.to_string(),
                found: marker.dataset.to_string(),
            });
        }
        Ok(())
    }

    /// First zoom at which markers are no longer clustered
    fn top(&self) -> u8 {
        self.policy.disable_clustering_at_zoom.min(self.max_zoom.saturating_add(1))
    }

    pub fn clustering_enabled_at(&self, zoom: u8) -> bool {
        zoom < self.top()
    }

    fn hierarchy(&self) -> &Hierarchy {
        self.hierarchy.get_or_init(|| {
            let hierarchy =
                Hierarchy::build(&self.markers, self.policy.max_cluster_radius, self.top());
            tracing::debug!(
                dataset = %self.dataset,
                markers = self.markers.len(),
                levels = hierarchy.levels.len(),
                "Built cluster hierarchy"
            );
            hierarchy
        })
    }

    fn to_cluster(&self, zoom: u8, index: usize, node: &Node) -> Cluster {
        Cluster {
            id: ClusterId { zoom, index },
            dataset: self.dataset.clone(),
            count: node.members.len(),
            center: node.center,
            bounds: node.bounds,
            members: node.members.clone(),
            glyph: ClusterGlyph::new(
                node.members.len(),
                &self.icon,
                &self.color,
                &self.policy.size_thresholds,
            ),
        }
    }

    /// Everything the dataset shows at `zoom`, ignoring the viewport extent
    pub fn items_at(&self, zoom: u8) -> Vec<RenderItem<'_>> {
        if !self.clustering_enabled_at(zoom) {
            return self.markers.iter().map(RenderItem::Marker).collect();
        }
        self.hierarchy().levels[usize::from(zoom)]
            .iter()
            .enumerate()
            .map(|(index, node)| match node.members.as_slice() {
                [single] => RenderItem::Marker(&self.markers[*single]),
                _ => RenderItem::Cluster(self.to_cluster(zoom, index, node)),
            })
            .collect()
    }

    /// Clusters only (two or more members) at `zoom`
    pub fn clusters_at(&self, zoom: u8) -> Vec<Cluster> {
        self.items_at(zoom)
            .into_iter()
            .filter_map(|item| match item {
                RenderItem::Cluster(c) => Some(c),
                RenderItem::Marker(_) => None,
            })
            .collect()
    }

    /// Items positioned inside the viewport
    pub fn render(&self, viewport: &Viewport) -> Vec<RenderItem<'_>> {
        let bounds = viewport.bounds();
        self.items_at(viewport.zoom)
            .into_iter()
            .filter(|item| bounds.contains(item.position()))
            .collect()
    }

    /// Look a cluster up by id in the current hierarchy
    pub fn cluster(&self, id: ClusterId) -> Option<Cluster> {
        if !self.clustering_enabled_at(id.zoom) {
            return None;
        }
        let node = self.hierarchy().levels[usize::from(id.zoom)].get(id.index)?;
        (node.members.len() > 1).then(|| self.to_cluster(id.zoom, id.index, node))
    }

    /// Lowest zoom above `cluster.id.zoom` at which the cluster's members no
    /// longer share one node
    pub fn expansion_zoom(&self, cluster: &Cluster) -> u8 {
        let top = self.top();
        let first = cluster.members[0];
        for zoom in cluster.id.zoom + 1..top {
            let level = &self.hierarchy().levels[usize::from(zoom)];
            let holder = level.iter().find(|n| n.members.binary_search(&first).is_ok());
            if holder.map_or(true, |n| n.members.len() < cluster.count) {
                return zoom;
            }
        }
        top
    }

    /// Resolve a click on a cluster.
    ///
    /// Members that share one position, or a click at maximum zoom, fan out
    /// when the policy allows; otherwise the viewport fits the members.
    pub fn click(&self, cluster: &Cluster, viewport: &Viewport) -> ClusterAction {
        let co_located = cluster.bounds.is_degenerate();
        if (co_located || viewport.at_max_zoom()) && self.policy.spiderfy_on_max_zoom {
            return ClusterAction::Spiderfy {
                center: cluster.center,
                legs: self.spider_legs(cluster, viewport.zoom),
            };
        }
        if !self.policy.zoom_to_bounds_on_click {
            return ClusterAction::Ignore;
        }

        let fitted =
            mercator::fit_zoom(&cluster.bounds, viewport.size, FIT_PADDING, viewport.max_zoom);
        let zoom = fitted.max(viewport.zoom.saturating_add(1)).min(viewport.max_zoom);
        ClusterAction::ZoomToBounds { bounds: cluster.bounds, zoom }
    }

    fn spider_legs(&self, cluster: &Cluster, zoom: u8) -> Vec<SpiderLeg> {
        let z = f64::from(zoom);
        let [cx, cy] = mercator::project(cluster.center, z);
        let count = cluster.members.len();
        let circumference = SPIDER_FOOT_SEPARATION * (2.0 + count as f64);
        let leg_length = circumference / (2.0 * PI);
        let step = 2.0 * PI / count as f64;

        cluster
            .members
            .iter()
            .enumerate()
            .map(|(i, &index)| {
                let angle = step * i as f64;
                let pixel = [cx + leg_length * angle.cos(), cy + leg_length * angle.sin()];
                let marker = &self.markers[index];
                SpiderLeg {
                    marker: index,
                    feature: marker.feature,
                    position: mercator::unproject(pixel, z),
                    origin: marker.position,
                }
            })
            .collect()
    }
}

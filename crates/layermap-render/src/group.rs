use layermap_core::error::Result;
use layermap_core::models::{DatasetConfig, DatasetId, Feature};
use serde::Serialize;

use crate::cluster::ClusterEngine;
use crate::marker::MarkerFactory;
use crate::plain::PlainGroup;

/// How a dataset is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupKind {
    Clustered,
    Plain,
}

/// The single render group owned for one dataset.
///
/// A clustered group sends point features to its engine and keeps any other
/// geometry in an unclustered overlay.
#[derive(Debug)]
pub enum RenderGroup {
    Clustered { engine: ClusterEngine, overlay: PlainGroup },
    Plain(PlainGroup),
}

impl RenderGroup {
    pub fn new(kind: GroupKind, config: &DatasetConfig, max_zoom: u8) -> Self {
        match kind {
            GroupKind::Clustered => RenderGroup::Clustered {
                engine: ClusterEngine::new(config, max_zoom),
                overlay: PlainGroup::new(config),
            },
            GroupKind::Plain => RenderGroup::Plain(PlainGroup::new(config)),
        }
    }

    pub fn kind(&self) -> GroupKind {
        match self {
            RenderGroup::Clustered { .. } => GroupKind::Clustered,
            RenderGroup::Plain(_) => GroupKind::Plain,
        }
    }

    pub fn dataset(&self) -> &DatasetId {
        match self {
            RenderGroup::Clustered { engine, .. } => engine.dataset(),
            RenderGroup::Plain(group) => group.dataset(),
        }
    }

    /// Build markers for a chunk of features and attach them.
    ///
    /// Returns the number of members added. Features without geometry are
    /// skipped.
    pub fn ingest(
        &mut self,
        factory: &MarkerFactory,
        config: &DatasetConfig,
        features: Vec<Feature>,
    ) -> Result<usize> {
        let mut added = 0;
        match self {
            RenderGroup::Clustered { engine, overlay } => {
                let mut markers = Vec::with_capacity(features.len());
                for feature in features {
                    if feature.geometry.is_none() {
                        continue;
                    }
                    if feature.is_point() {
                        markers.extend(factory.create(config, feature));
                    } else {
                        overlay.add_shape(feature);
                        added += 1;
                    }
                }
                added += engine.add_markers(markers)?;
            }
            RenderGroup::Plain(group) => {
                for feature in features {
                    if feature.geometry.is_none() {
                        continue;
                    }
                    if feature.is_point() {
                        if let Some(marker) = factory.create(config, feature) {
                            group.add_marker(marker)?;
                            added += 1;
                        }
                    } else {
                        group.add_shape(feature);
                        added += 1;
                    }
                }
            }
        }
        Ok(added)
    }

    /// Total members: markers plus shapes
    pub fn len(&self) -> usize {
        match self {
            RenderGroup::Clustered { engine, overlay } => engine.len() + overlay.len(),
            RenderGroup::Plain(group) => group.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn marker_count(&self) -> usize {
        match self {
            RenderGroup::Clustered { engine, overlay } => {
                engine.len() + overlay.markers().len()
            }
            RenderGroup::Plain(group) => group.markers().len(),
        }
    }

    pub fn engine(&self) -> Option<&ClusterEngine> {
        match self {
            RenderGroup::Clustered { engine, .. } => Some(engine),
            RenderGroup::Plain(_) => None,
        }
    }

    /// The group holding shapes: the overlay of a clustered group, or the
    /// plain group itself
    pub fn shapes(&self) -> &PlainGroup {
        match self {
            RenderGroup::Clustered { overlay, .. } => overlay,
            RenderGroup::Plain(group) => group,
        }
    }

    pub fn shapes_mut(&mut self) -> &mut PlainGroup {
        match self {
            RenderGroup::Clustered { overlay, .. } => overlay,
            RenderGroup::Plain(group) => group,
        }
    }

    /// Free every member
    pub fn clear(&mut self) {
        match self {
            RenderGroup::Clustered { engine, overlay } => {
                engine.clear();
                overlay.clear();
            }
            RenderGroup::Plain(group) => group.clear(),
        }
    }
}

//! Unclustered render groups for boundary layers and sparse datasets.

use layermap_core::error::{LayermapError, Result};
use layermap_core::models::{DatasetConfig, DatasetId, Feature, FeatureId, Position};
use layermap_geo::models::hit_test;
use serde::Serialize;

use crate::marker::Marker;

/// Stroke and fill of a path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStyle {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
}

impl PathStyle {
    pub fn base(color: &str) -> Self {
        Self {
            color: color.to_string(),
            weight: 2.0,
            opacity: 0.8,
            fill_color: color.to_string(),
            fill_opacity: 0.2,
        }
    }

    pub fn hover(color: &str) -> Self {
        Self { weight: 4.0, opacity: 1.0, fill_opacity: 0.5, ..Self::base(color) }
    }
}

/// Dataset rendered without clustering. Non-point features are kept as
/// shapes; point features become markers.
#[derive(Debug)]
pub struct PlainGroup {
    dataset: DatasetId,
    shapes: Vec<Feature>,
    markers: Vec<Marker>,
    base_style: PathStyle,
    hover_style: PathStyle,
    hovered: Option<FeatureId>,
}

impl PlainGroup {
    pub fn new(config: &DatasetConfig) -> Self {
        Self {
            dataset: config.id.clone(),
            shapes: Vec::new(),
            markers: Vec::new(),
            base_style: PathStyle::base(&config.color),
            hover_style: PathStyle::hover(&config.color),
            hovered: None,
        }
    }

    pub fn dataset(&self) -> &DatasetId {
        &self.dataset
    }

    pub fn add_shape(&mut self, feature: Feature) {
        self.shapes.push(feature);
    }

    pub fn add_marker(&mut self, marker: Marker) -> Result<()> {
        if marker.dataset != self.dataset {
            return Err(LayermapError::DatasetMismatch {
                expected: self.dataset.to_string(),
                found: marker.dataset.to_string(),
            });
        }
        self.markers.push(marker);
        Ok(())
    }

    pub fn shapes(&self) -> &[Feature] {
        &self.shapes
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.shapes.len() + self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Topmost shape under `position`; later shapes paint over earlier ones
    pub fn shape_at(&self, position: Position) -> Option<&Feature> {
        self.shapes
            .iter()
            .rev()
            .find(|f| f.geometry.as_ref().is_some_and(|g| hit_test(g, position)))
    }

    /// Move the pointer to `position`, returning the highlighted shape
    pub fn hover(&mut self, position: Position) -> Option<FeatureId> {
        self.hovered = self.shape_at(position).map(|f| f.id);
        self.hovered
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    pub fn hovered(&self) -> Option<FeatureId> {
        self.hovered
    }

    /// Current style of a shape
    pub fn style(&self, feature: FeatureId) -> &PathStyle {
        if self.hovered == Some(feature) {
            &self.hover_style
        } else {
            &self.base_style
        }
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.markers.clear();
        self.hovered = None;
    }
}

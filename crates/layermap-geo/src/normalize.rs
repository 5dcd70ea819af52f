//! Coordinate normalization into WGS84 longitude/latitude.
//!
//! A geometry is classified once, from its first position. If that position
//! lies outside the geographic envelope (`x > 180 || y > 90`) the whole
//! geometry is treated as projected and every position is transformed;
//! otherwise it is left untouched. Mixed-projection geometries are not
//! detected.
//!
//! Only `Point`, `Polygon` and `MultiPolygon` are examined. Normalization
//! never fails: when the exact transform errors on any position the original
//! coordinates are kept and the failure is logged.

use layermap_core::config::LayeredConfig;
use layermap_core::error::Result;
use layermap_core::models::{Feature, Geometry, GeometryType, Position};
use serde::Serialize;
use std::sync::Arc;

use crate::projection::{ExactTransform, LinearApproximation, Proj4Transform};

/// Inferred coordinate system of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoordinateSystem {
    Geographic,
    Projected,
}

/// Classify a single position
pub fn classify(position: Position) -> CoordinateSystem {
    let [x, y] = position;
    if x > 180.0 || y > 90.0 {
        CoordinateSystem::Projected
    } else {
        CoordinateSystem::Geographic
    }
}

/// What happened to one geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NormalizeOutcome {
    /// Already geographic, or empty
    Unchanged,
    /// Reprojected with the exact transform
    Exact,
    /// Reprojected with the linear approximation
    Approximated,
    /// The exact transform failed; coordinates were left as they were
    Degraded,
    /// Geometry type is not normalized and was passed through
    Skipped,
}

/// Per-outcome tally over a feature set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub unchanged: usize,
    pub exact: usize,
    pub approximated: usize,
    pub degraded: usize,
    pub skipped: usize,
    pub missing_geometry: usize,
}

impl NormalizeReport {
    fn record(&mut self, outcome: NormalizeOutcome) {
        match outcome {
            NormalizeOutcome::Unchanged => self.unchanged += 1,
            NormalizeOutcome::Exact => self.exact += 1,
            NormalizeOutcome::Approximated => self.approximated += 1,
            NormalizeOutcome::Degraded => self.degraded += 1,
            NormalizeOutcome::Skipped => self.skipped += 1,
        }
    }

    /// Number of geometries whose coordinates were rewritten
    pub fn reprojected(&self) -> usize {
        self.exact + self.approximated
    }
}

/// Reprojects feature geometries into WGS84
#[derive(Debug, Clone, Default)]
pub struct CoordinateNormalizer {
    exact: Option<Arc<dyn ExactTransform>>,
    linear: LinearApproximation,
}

impl CoordinateNormalizer {
    /// Normalizer with only the linear fallback
    pub fn new(linear: LinearApproximation) -> Self {
        Self { exact: None, linear }
    }

    /// Register an exact transform, preferred over the linear fallback
    pub fn with_exact(mut self, exact: Arc<dyn ExactTransform>) -> Self {
        self.exact = Some(exact);
        self
    }

    /// Build from configuration; an empty `source_projection` disables the
    /// exact path
    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        let normalizer =
            Self::new(LinearApproximation::new(config.linear_approximation.value));
        match config.exact_projection() {
            Some(definition) => {
                let exact = Proj4Transform::new(definition)?;
                tracing::debug!(projection = definition, "Registered exact source projection");
                Ok(normalizer.with_exact(Arc::new(exact)))
            }
            None => Ok(normalizer),
        }
    }

    pub fn has_exact(&self) -> bool {
        self.exact.is_some()
    }

    /// Normalize one geometry in place
    pub fn normalize(&self, geometry: &mut Geometry) -> NormalizeOutcome {
        match geometry.geometry_type() {
            GeometryType::Point | GeometryType::Polygon | GeometryType::MultiPolygon => {}
            _ => return NormalizeOutcome::Skipped,
        }

        let Some(first) = geometry.first_position() else {
            return NormalizeOutcome::Unchanged;
        };
        if classify(first) == CoordinateSystem::Geographic {
            return NormalizeOutcome::Unchanged;
        }

        match &self.exact {
            Some(exact) => {
                // Transform a copy so a failure part way through leaves the
                // original untouched
                let mut candidate = geometry.clone();
                let mut failure = None;
                candidate.for_each_position_mut(|p| {
                    if failure.is_some() {
                        return;
                    }
                    match exact.to_geographic(p[0], p[1]) {
                        Ok((lon, lat)) => *p = [lon, lat],
                        Err(e) => failure = Some(e),
                    }
                });

                match failure {
                    None => {
                        *geometry = candidate;
                        NormalizeOutcome::Exact
                    }
                    Some(e) => {
                        tracing::warn!(
                            projection = exact.source(),
                            error = %e,
                            "Exact transform failed, keeping original coordinates"
                        );
                        NormalizeOutcome::Degraded
                    }
                }
            }
            None => {
                geometry.for_each_position_mut(|p| {
                    let (lon, lat) = self.linear.to_geographic(p[0], p[1]);
                    *p = [lon, lat];
                });
                NormalizeOutcome::Approximated
            }
        }
    }

    /// Normalize a feature's geometry, if it has one
    pub fn normalize_feature(&self, feature: &mut Feature) -> Option<NormalizeOutcome> {
        feature.geometry.as_mut().map(|g| self.normalize(g))
    }

    /// Normalize every feature and tally the outcomes
    pub fn normalize_features(&self, features: &mut [Feature]) -> NormalizeReport {
        let mut report = NormalizeReport::default();
        for feature in features.iter_mut() {
            match self.normalize_feature(feature) {
                Some(outcome) => report.record(outcome),
                None => report.missing_geometry += 1,
            }
        }
        if report.approximated > 0 {
            tracing::debug!(
                count = report.approximated,
                "Reprojected with linear approximation; positions are approximate"
            );
        }
        report
    }
}

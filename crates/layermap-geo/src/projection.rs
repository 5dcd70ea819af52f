//! Projected-to-geographic transforms.
//!
//! [`ExactTransform`] implementations perform a real inverse projection into
//! WGS84. [`LinearApproximation`] is the degraded fallback used when no exact
//! transform is registered; its error grows with distance from the reference
//! meridian and it must not be relied on for anything beyond display.

use layermap_core::config::LinearApproximationConfig;
use layermap_core::error::{LayermapError, Result};
use proj4rs::proj::Proj as Proj4;
use std::fmt;

/// PROJ.4 definition of the WGS84 geographic target
pub const WGS84_LONGLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Exact forward transform from a registered source projection to WGS84
/// longitude/latitude in degrees.
pub trait ExactTransform: Send + Sync + fmt::Debug {
    /// Transform one `(x, y)` pair into `(longitude, latitude)`
    fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64)>;

    /// Human readable description of the source projection
    fn source(&self) -> &str;
}

/// Pure Rust transform backed by `proj4rs`
pub struct Proj4Transform {
    definition: String,
    from: Proj4,
    to: Proj4,
}

impl Proj4Transform {
    /// Build a transform from a PROJ.4 source definition, e.g.
    /// `+proj=utm +zone=38 +datum=WGS84 +units=m +no_defs`
    pub fn new(definition: &str) -> Result<Self> {
        let from = Proj4::from_proj_string(definition).map_err(|e| {
            LayermapError::ConfigInvalid {
                key: "source_projection".to_string(),
                reason: format!("failed to build source PROJ.4 '{}': {}", definition, e),
            }
        })?;
        let to = Proj4::from_proj_string(WGS84_LONGLAT).map_err(|e| LayermapError::Projection {
            reason: format!("failed to build WGS84 target: {}", e),
        })?;

        Ok(Self { definition: definition.to_string(), from, to })
    }
}

impl fmt::Debug for Proj4Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proj4Transform").field("definition", &self.definition).finish()
    }
}

impl ExactTransform for Proj4Transform {
    fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(LayermapError::Projection {
                reason: format!("non-finite input ({}, {})", x, y),
            });
        }

        let mut point = (x, y, 0.0);
        proj4rs::transform::transform(&self.from, &self.to, &mut point)
            .map_err(|e| LayermapError::Projection { reason: e.to_string() })?;

        // longlat output comes back in radians
        let (lon, lat) = (point.0.to_degrees(), point.1.to_degrees());
        if !lon.is_finite() || !lat.is_finite() {
            return Err(LayermapError::Projection {
                reason: format!("({}, {}) has no geographic equivalent", x, y),
            });
        }
        Ok((lon, lat))
    }

    fn source(&self) -> &str {
        &self.definition
    }
}

#[cfg(feature = "libproj")]
pub use self::libproj::LibProjTransform;

#[cfg(feature = "libproj")]
mod libproj {
    use super::ExactTransform;
    use layermap_core::error::{LayermapError, Result};
    use proj::Proj;
    use std::fmt;
    use std::sync::Mutex;

    /// Transform through the system PROJ library for a known CRS, e.g. `EPSG:32638`
    pub struct LibProjTransform {
        crs: String,
        proj: Mutex<Proj>,
    }

    impl LibProjTransform {
        pub fn new(crs: &str) -> Result<Self> {
            let proj = Proj::new_known_crs(crs, "EPSG:4326", None).map_err(|e| {
                LayermapError::ConfigInvalid {
                    key: "source_projection".to_string(),
                    reason: format!("Failed to create projection from {} to EPSG:4326: {}", crs, e),
                }
            })?;
            Ok(Self { crs: crs.to_string(), proj: Mutex::new(proj) })
        }
    }

    impl fmt::Debug for LibProjTransform {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("LibProjTransform").field("crs", &self.crs).finish()
        }
    }

    impl ExactTransform for LibProjTransform {
        fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64)> {
            let proj = self.proj.lock().map_err(|_| LayermapError::Projection {
                reason: "projection handle poisoned".to_string(),
            })?;
            // EPSG:4326 is declared lat/lon but PROJ normalizes to lon/lat here
            proj.convert((x, y))
                .map_err(|e| LayermapError::Projection { reason: e.to_string() })
        }

        fn source(&self) -> &str {
            &self.crs
        }
    }
}

/// Region-calibrated linear approximation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinearApproximation {
    config: LinearApproximationConfig,
}

impl LinearApproximation {
    pub fn new(config: LinearApproximationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LinearApproximationConfig {
        &self.config
    }

    /// `(longitude, latitude)` for a projected pair
    pub fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        let c = &self.config;
        let lon = (x - c.false_origin_x) / c.meters_per_degree_lon + c.reference_lon;
        let lat = y / c.meters_per_degree_lat;
        (lon, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layermap_core::config::DEFAULT_SOURCE_PROJECTION;

    #[test]
    fn test_linear_central_meridian() {
        let linear = LinearApproximation::default();
        let (lon, lat) = linear.to_geographic(500_000.0, 3_905_000.0);
        assert!((lon - 45.0).abs() < 1e-9);
        assert!((lat - 35.3157).abs() < 1e-3);
    }

    #[test]
    fn test_linear_custom_constants() {
        let linear = LinearApproximation::new(LinearApproximationConfig {
            false_origin_x: 0.0,
            meters_per_degree_lon: 100_000.0,
            reference_lon: 10.0,
            meters_per_degree_lat: 100_000.0,
        });
        assert_eq!(linear.to_geographic(200_000.0, 500_000.0), (12.0, 5.0));
    }

    #[test]
    fn test_proj4_utm38_central_meridian() {
        let transform = Proj4Transform::new(DEFAULT_SOURCE_PROJECTION).unwrap();
        let (lon, lat) = transform.to_geographic(500_000.0, 3_905_000.0).unwrap();
        assert!((lon - 45.0).abs() < 1e-6, "lon = {}", lon);
        assert!((35.2..35.4).contains(&lat), "lat = {}", lat);
    }

    #[test]
    fn test_proj4_rejects_non_finite() {
        let transform = Proj4Transform::new(DEFAULT_SOURCE_PROJECTION).unwrap();
        assert!(transform.to_geographic(f64::NAN, 3_905_000.0).is_err());
    }

    #[test]
    fn test_proj4_invalid_definition() {
        let err = Proj4Transform::new("+proj=does_not_exist").unwrap_err();
        assert!(matches!(err, LayermapError::ConfigInvalid { .. }));
    }
}

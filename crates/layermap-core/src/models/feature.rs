use serde::{Deserialize, Serialize};

use super::geometry::Geometry;
use crate::error::{LayermapError, Result};

/// Position of a feature within its dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(pub u64);

/// One geographic entity with scalar properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Index within the owning dataset
    pub id: FeatureId,

    /// Geometry, `None` when the source feature had none
    pub geometry: Option<Geometry>,

    /// Feature properties
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(
        id: FeatureId,
        geometry: Geometry,
        properties: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self { id, geometry: Some(geometry), properties }
    }

    /// Create a point feature with a `name` property
    pub fn named_point(id: u64, name: impl Into<String>, x: f64, y: f64) -> Self {
        let mut properties = serde_json::Map::new();
        properties.insert("name".to_string(), serde_json::Value::String(name.into()));
        Self::new(FeatureId(id), Geometry::point(x, y), properties)
    }

    pub fn is_point(&self) -> bool {
        self.geometry.as_ref().is_some_and(Geometry::is_point)
    }

    /// Display name from the first present of `name`, `NAME`, `name_en`,
    /// `ADM1_EN`, `ADM2_EN`, `ADM3_EN`
    pub fn name(&self) -> Option<&str> {
        ["name", "NAME", "name_en", "ADM1_EN", "ADM2_EN", "ADM3_EN"]
            .iter()
            .find_map(|key| self.properties.get(*key).and_then(|v| v.as_str()))
    }

    /// String view of a property, numbers and booleans rendered as text
    pub fn property_text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Parse a GeoJSON document into features.
///
/// A `FeatureCollection`, a lone `Feature` and a bare geometry are all
/// accepted. Geometries that cannot be represented are kept verbatim as
/// [`Geometry::Unsupported`] rather than failing the whole document.
pub fn parse_feature_collection(content: &str) -> Result<Vec<Feature>> {
    let geojson: geojson::GeoJson = content.parse().map_err(|e| {
        LayermapError::Serialization(format!("Failed to parse GeoJSON: {}", e))
    })?;

    let features = match geojson {
        geojson::GeoJson::FeatureCollection(fc) => fc
            .features
            .iter()
            .enumerate()
            .map(|(idx, feature)| convert_feature(feature, idx as u64))
            .collect(),
        geojson::GeoJson::Feature(feature) => vec![convert_feature(&feature, 0)],
        geojson::GeoJson::Geometry(geom) => vec![Feature {
            id: FeatureId(0),
            geometry: convert_geometry(&geom, 0),
            properties: serde_json::Map::new(),
        }],
    };

    Ok(features)
}

fn convert_feature(feature: &geojson::Feature, idx: u64) -> Feature {
    let geometry = feature.geometry.as_ref().and_then(|geom| convert_geometry(geom, idx));
    let properties = feature.properties.clone().unwrap_or_default();
    Feature { id: FeatureId(idx), geometry, properties }
}

fn convert_geometry(geometry: &geojson::Geometry, idx: u64) -> Option<Geometry> {
    match Geometry::try_from(geometry) {
        Ok(geom) => Some(geom),
        Err(reason) => {
            tracing::warn!(feature = idx, reason = %reason.0, "Keeping unsupported geometry as is");
            match serde_json::to_value(geometry) {
                Ok(raw) => Some(Geometry::Unsupported(raw)),
                Err(e) => {
                    tracing::warn!(feature = idx, error = %e, "Dropping unserializable geometry");
                    None
                }
            }
        }
    }
}

/// Serialize features back into a GeoJSON `FeatureCollection` value
pub fn to_feature_collection(features: &[Feature]) -> serde_json::Value {
    let features: Vec<serde_json::Value> = features
        .iter()
        .map(|f| {
            serde_json::json!({
                "type": "Feature",
                "id": f.id.0,
                "geometry": f.geometry.as_ref().map(Geometry::to_geojson),
                "properties": f.properties,
            })
        })
        .collect();

    serde_json::json!({ "type": "FeatureCollection", "features": features })
}

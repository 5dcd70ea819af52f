//! Pre-flattened point collections served by `/api/<aggregate>-data`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::feature::{Feature, FeatureId};
use super::geometry::Geometry;

/// Dataset value assigned to records that carry none
pub const UNKNOWN_DATASET: &str = "Unknown";

/// One flattened point row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub latitude: Option<serde_json::Value>,

    #[serde(default)]
    pub longitude: Option<serde_json::Value>,

    #[serde(default)]
    pub dataset: Option<String>,

    /// Every other column of the source row
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PointRecord {
    pub fn dataset_key(&self) -> &str {
        self.dataset.as_deref().filter(|d| !d.is_empty()).unwrap_or(UNKNOWN_DATASET)
    }

    /// Validated `(longitude, latitude)`; numeric strings are accepted
    pub fn lon_lat(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.as_ref().and_then(number)?;
        let lon = self.longitude.as_ref().and_then(number)?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some((lon, lat))
    }
}

fn number(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Envelope returned by an aggregate endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCollection {
    pub success: bool,
    pub count: usize,
    pub data: Vec<PointRecord>,
}

impl PointCollection {
    pub fn new(data: Vec<PointRecord>) -> Self {
        Self { success: true, count: data.len(), data }
    }

    /// Point features for the records whose dataset equals `key`.
    ///
    /// Records with missing or out-of-range coordinates are skipped with a
    /// warning. Feature ids follow the record's position in `data`.
    pub fn features_for(&self, key: &str) -> Vec<Feature> {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, record)| record.dataset_key() == key)
            .filter_map(|(idx, record)| record_to_feature(idx, record))
            .collect()
    }

    /// Number of records per dataset value
    pub fn breakdown(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.data {
            *counts.entry(record.dataset_key().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Distinct dataset values in first-seen order
    pub fn dataset_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for record in &self.data {
            let key = record.dataset_key();
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
        keys
    }
}

fn record_to_feature(idx: usize, record: &PointRecord) -> Option<Feature> {
    let Some((lon, lat)) = record.lon_lat() else {
        tracing::warn!(row = idx, dataset = record.dataset_key(), "Skipping row with invalid coordinates");
        return None;
    };

    let mut properties = record.extra.clone();
    let name = record
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("Point {}", idx + 1));
    properties.insert("name".to_string(), serde_json::Value::String(name));
    properties.insert(
        "dataset".to_string(),
        serde_json::Value::String(record.dataset_key().to_string()),
    );
    properties.insert("latitude".to_string(), serde_json::json!(lat));
    properties.insert("longitude".to_string(), serde_json::json!(lon));

    Some(Feature::new(FeatureId(idx as u64), Geometry::point(lon, lat), properties))
}

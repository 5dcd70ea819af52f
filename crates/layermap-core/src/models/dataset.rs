use serde::{Deserialize, Serialize};
use std::fmt;

/// String identity of a dataset (e.g. `"HERA"`, `"irq_admbnda_adm1"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub String);

impl DatasetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Category slug used in `/api/<category>-files` listings
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(pub String);

impl Category {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Administrative boundaries
    pub fn admin() -> Self {
        Self::new("admin")
    }

    /// Point-of-interest collections
    pub fn poi() -> Self {
        Self::new("poi")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a dataset's features come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetOrigin {
    /// One GeoJSON file served at `/api/<category>/<name>`
    File { category: Category, name: String },

    /// The subset of `/api/<endpoint>-data` whose `dataset` field equals `key`
    Aggregate { endpoint: String, key: String },
}

/// One entry of a `/api/<category>-files` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDescriptor {
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_level: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Member-count thresholds selecting a cluster glyph's size bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeThresholds {
    /// Largest count rendered as a small glyph
    pub small_max: usize,
    /// Largest count rendered as a medium glyph
    pub medium_max: usize,
}

impl SizeThresholds {
    /// ≤10 / 11–100 / >100
    pub const GENERAL: SizeThresholds = SizeThresholds { small_max: 10, medium_max: 100 };

    /// ≤10 / 11–50 / >50
    pub const SERVICE_POINT: SizeThresholds = SizeThresholds { small_max: 10, medium_max: 50 };
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self::GENERAL
    }
}

/// Tunable clustering behaviour for one dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterPolicy {
    /// Screen-space distance in pixels below which markers merge
    pub max_cluster_radius: f64,

    /// Zoom level above which every marker renders on its own
    pub disable_clustering_at_zoom: u8,

    /// Clicking a cluster fits the viewport to its members
    pub zoom_to_bounds_on_click: bool,

    /// Clicking co-located members at max zoom fans them out
    pub spiderfy_on_max_zoom: bool,

    pub size_thresholds: SizeThresholds,
}

impl ClusterPolicy {
    /// Tight radius and finer exploration for densely packed service points
    pub fn service_points() -> Self {
        Self {
            max_cluster_radius: 50.0,
            disable_clustering_at_zoom: 16,
            zoom_to_bounds_on_click: true,
            spiderfy_on_max_zoom: true,
            size_thresholds: SizeThresholds::SERVICE_POINT,
        }
    }

    /// Loose radius for sparse regional datasets
    pub fn regional() -> Self {
        Self {
            max_cluster_radius: 80.0,
            disable_clustering_at_zoom: 15,
            zoom_to_bounds_on_click: true,
            spiderfy_on_max_zoom: true,
            size_thresholds: SizeThresholds::GENERAL,
        }
    }
}

impl Default for ClusterPolicy {
    fn default() -> Self {
        Self::regional()
    }
}

/// Immutable per-dataset configuration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub id: DatasetId,

    pub display_name: String,

    pub category: Category,

    /// CSS color, e.g. `#28a745`
    pub color: String,

    /// Icon reference (glyph name or URL)
    pub icon: String,

    pub origin: DatasetOrigin,

    /// Explicitly designated point-service category; always clustered
    #[serde(default)]
    pub service_point: bool,

    /// Overrides the policy implied by `service_point`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterPolicy>,

    /// Overrides the default batch chunk size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
}

/// Default chunk size for datasets with heavy per-marker construction
pub const SERVICE_POINT_CHUNK_SIZE: usize = 50;

/// Default chunk size for lightweight datasets
pub const DEFAULT_CHUNK_SIZE: usize = 100;

impl DatasetConfig {
    /// Config for a dataset backed by one file of a category listing
    pub fn file(
        id: impl Into<String>,
        category: Category,
        color: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            origin: DatasetOrigin::File { category: category.clone(), name: id.clone() },
            id: DatasetId(id),
            category,
            color: color.into(),
            icon: icon.into(),
            service_point: false,
            cluster: None,
            chunk_size: None,
        }
    }

    /// Config for one `dataset` value of an aggregate point endpoint
    pub fn aggregate(
        key: impl Into<String>,
        endpoint: impl Into<String>,
        color: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let endpoint = endpoint.into();
        Self {
            display_name: key.clone(),
            category: Category::new(endpoint.clone()),
            origin: DatasetOrigin::Aggregate { endpoint, key: key.clone() },
            id: DatasetId(key),
            color: color.into(),
            icon: icon.into(),
            service_point: false,
            cluster: None,
            chunk_size: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_service_point(mut self, service_point: bool) -> Self {
        self.service_point = service_point;
        self
    }

    pub fn with_cluster_policy(mut self, policy: ClusterPolicy) -> Self {
        self.cluster = Some(policy);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Effective clustering policy
    pub fn cluster_policy(&self) -> ClusterPolicy {
        self.cluster.unwrap_or_else(|| {
            if self.service_point {
                ClusterPolicy::service_points()
            } else {
                ClusterPolicy::regional()
            }
        })
    }

    /// Effective batch chunk size, never zero
    pub fn chunk_size(&self) -> usize {
        let default =
            if self.service_point { SERVICE_POINT_CHUNK_SIZE } else { DEFAULT_CHUNK_SIZE };
        self.chunk_size.unwrap_or(default).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_point_defaults() {
        let config = DatasetConfig::aggregate("HERA", "combined", "#28a745", "fa-hospital")
            .with_service_point(true);
        let policy = config.cluster_policy();
        assert_eq!(policy.size_thresholds, SizeThresholds::SERVICE_POINT);
        assert_eq!(config.chunk_size(), SERVICE_POINT_CHUNK_SIZE);
    }

    #[test]
    fn test_explicit_policy_wins() {
        let mut policy = ClusterPolicy::regional();
        policy.max_cluster_radius = 30.0;
        let config = DatasetConfig::file("schools", Category::poi(), "#007bff", "fa-school")
            .with_service_point(true)
            .with_cluster_policy(policy);
        assert_eq!(config.cluster_policy().max_cluster_radius, 30.0);
    }

    #[test]
    fn test_chunk_size_never_zero() {
        let config = DatasetConfig::file("x", Category::poi(), "#000", "dot").with_chunk_size(0);
        assert_eq!(config.chunk_size(), 1);
    }

    #[test]
    fn test_descriptor_wire_format() {
        let json = r#"{"name":"irq_adm1","displayName":"Governorates","adminLevel":"1","type":"admin"}"#;
        let descriptor: DatasetDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.display_name, "Governorates");
        assert_eq!(descriptor.admin_level.as_deref(), Some("1"));
        assert_eq!(descriptor.kind, "admin");
        assert!(descriptor.category.is_none());
    }
}

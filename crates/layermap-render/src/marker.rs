//! Marker construction with a shared icon descriptor cache.
//!
//! Icon descriptors are keyed by `(dataset, color)` and live as long as the
//! factory's cache. The key space is bounded by the number of datasets, so
//! entries are never evicted. Popups are built on first access only.

use layermap_core::models::{DatasetConfig, DatasetId, Feature, FeatureId, Position};
use serde::Serialize;
use std::collections::HashMap;

use crate::html::escape_html;
use std::sync::{Arc, Mutex, OnceLock};

/// Rendered icon size in pixels
pub const ICON_SIZE: [u32; 2] = [30, 30];

/// Renderable icon shared by every marker of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconDescriptor {
    pub dataset: DatasetId,
    pub color: String,
    pub icon: String,
    pub size: [u32; 2],
    /// Pixel offset of the geographic position within the icon
    pub anchor: [u32; 2],
    pub html: String,
}

impl IconDescriptor {
    fn build(dataset: &DatasetId, color: &str, icon: &str) -> Self {
        let html = format!(
            "<div class=\"layer-marker\" style=\"background-color:{color};width:{w}px;height:{h}px\">\
             <i class=\"fa {icon}\"></i></div>",
            color = escape_html(color),
            icon = escape_html(icon),
            w = ICON_SIZE[0],
            h = ICON_SIZE[1],
        );
        Self {
            dataset: dataset.clone(),
            color: color.to_string(),
            icon: icon.to_string(),
            size: ICON_SIZE,
            anchor: [ICON_SIZE[0] / 2, ICON_SIZE[1] / 2],
            html,
        }
    }
}

/// Popup payload, one row per scalar property
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub title: String,
    pub rows: Vec<(String, String)>,
}

impl Popup {
    fn from_feature(dataset: &DatasetId, feature: &Feature) -> Self {
        let title = feature
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} #{}", dataset, feature.id.0 + 1));

        let rows = feature
            .properties
            .keys()
            .filter(|key| key.as_str() != "name")
            .filter_map(|key| feature.property_text(key).map(|value| (key.clone(), value)))
            .filter(|(_, value)| !value.is_empty())
            .collect();

        Self { title, rows }
    }

    pub fn to_html(&self) -> String {
        let mut html = format!("<h4>{}</h4><table>", escape_html(&self.title));
        for (key, value) in &self.rows {
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>",
                escape_html(key),
                escape_html(value)
            ));
        }
        html.push_str("</table>");
        html
    }
}

/// One renderable point
#[derive(Debug)]
pub struct Marker {
    pub dataset: DatasetId,
    pub feature: FeatureId,
    /// `[longitude, latitude]`
    pub position: Position,
    pub icon: Arc<IconDescriptor>,
    source: Feature,
    popup: OnceLock<Popup>,
}

impl Marker {
    /// Popup content, built on the first call and reused afterwards
    pub fn popup(&self) -> &Popup {
        self.popup.get_or_init(|| Popup::from_feature(&self.dataset, &self.source))
    }

    /// Whether the popup has been built yet
    pub fn has_popup(&self) -> bool {
        self.popup.get().is_some()
    }

    pub fn properties(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.source.properties
    }
}

type IconKey = (DatasetId, String);

/// Builds markers, caching one icon descriptor per `(dataset, color)`.
///
/// Clones share the same cache.
#[derive(Debug, Clone, Default)]
pub struct MarkerFactory {
    icons: Arc<Mutex<HashMap<IconKey, Arc<IconDescriptor>>>>,
}

impl MarkerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached icon descriptor for `(dataset, color)`, created on first use
    pub fn icon(&self, dataset: &DatasetId, color: &str, icon: &str) -> Arc<IconDescriptor> {
        // Entries are insert-once, so a poisoned map is still consistent
        let mut icons = self.icons.lock().unwrap_or_else(|e| e.into_inner());
        let cached = icons
            .entry((dataset.clone(), color.to_string()))
            .or_insert_with(|| Arc::new(IconDescriptor::build(dataset, color, icon)));
        Arc::clone(cached)
    }

    /// Marker for a point feature; `None` for any other geometry
    pub fn create(&self, config: &DatasetConfig, feature: Feature) -> Option<Marker> {
        let position = feature.geometry.as_ref()?.as_point()?;
        let icon = self.icon(&config.id, &config.color, &config.icon);
        Some(Marker {
            dataset: config.id.clone(),
            feature: feature.id,
            position,
            icon,
            source: feature,
            popup: OnceLock::new(),
        })
    }

    /// Number of distinct cached descriptors
    pub fn cached_icons(&self) -> usize {
        self.icons.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layermap_core::models::{Category, Geometry};

    fn hera() -> DatasetConfig {
        DatasetConfig::aggregate("HERA", "combined", "#28a745", "fa-hospital")
    }

    #[test]
    fn test_icon_cache_returns_same_instance() {
        let factory = MarkerFactory::new();
        let id = DatasetId::from("HERA");
        let a = factory.icon(&id, "#28a745", "fa-hospital");
        let b = factory.icon(&id, "#28a745", "fa-hospital");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.cached_icons(), 1);
    }

    #[test]
    fn test_icon_cache_distinct_keys() {
        let factory = MarkerFactory::new();
        let hera = factory.icon(&DatasetId::from("HERA"), "#28a745", "fa-hospital");
        let recolored = factory.icon(&DatasetId::from("HERA"), "#dc3545", "fa-hospital");
        let other = factory.icon(&DatasetId::from("WHO"), "#28a745", "fa-hospital");
        assert!(!Arc::ptr_eq(&hera, &recolored));
        assert!(!Arc::ptr_eq(&hera, &other));
        assert_eq!(factory.cached_icons(), 3);
    }

    #[test]
    fn test_clones_share_cache() {
        let factory = MarkerFactory::new();
        let clone = factory.clone();
        let a = factory.icon(&DatasetId::from("HERA"), "#28a745", "fa-hospital");
        let b = clone.icon(&DatasetId::from("HERA"), "#28a745", "fa-hospital");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_markers_share_icon() {
        let factory = MarkerFactory::new();
        let config = hera();
        let m1 = factory.create(&config, Feature::named_point(0, "a", 44.0, 33.0)).unwrap();
        let m2 = factory.create(&config, Feature::named_point(1, "b", 44.1, 33.1)).unwrap();
        assert!(Arc::ptr_eq(&m1.icon, &m2.icon));
        assert_eq!(m2.position, [44.1, 33.1]);
    }

    #[test]
    fn test_non_point_yields_no_marker() {
        let factory = MarkerFactory::new();
        let config = DatasetConfig::file("adm1", Category::admin(), "#3388ff", "fa-draw-polygon");
        let mut feature = Feature::named_point(0, "x", 0.0, 0.0);
        feature.geometry = Some(Geometry::polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]]));
        assert!(factory.create(&config, feature).is_none());
        assert_eq!(factory.cached_icons(), 0);
    }

    #[test]
    fn test_popup_is_lazy_and_cached() {
        let factory = MarkerFactory::new();
        let mut feature = Feature::named_point(0, "Clinic A", 44.0, 33.0);
        feature.properties.insert("beds".to_string(), serde_json::json!(12));
        let marker = factory.create(&hera(), feature).unwrap();

        assert!(!marker.has_popup());
        let first = marker.popup() as *const Popup;
        assert!(marker.has_popup());
        assert_eq!(marker.popup().title, "Clinic A");
        assert_eq!(marker.popup().rows, vec![("beds".to_string(), "12".to_string())]);
        assert_eq!(first, marker.popup() as *const Popup);
    }

    #[test]
    fn test_popup_title_fallback() {
        let factory = MarkerFactory::new();
        let mut feature = Feature::named_point(4, "", 44.0, 33.0);
        feature.properties.clear();
        let marker = factory.create(&hera(), feature).unwrap();
        assert_eq!(marker.popup().title, "HERA #5");
        assert!(marker.popup().to_html().starts_with("<h4>HERA #5</h4>"));
    }

    #[test]
    fn test_popup_html_escapes_properties() {
        let factory = MarkerFactory::new();
        let mut feature = Feature::named_point(0, "<script>alert(1)</script>", 44.0, 33.0);
        feature.properties.insert("note<b>".to_string(), serde_json::json!("a & \"b\""));
        let marker = factory.create(&hera(), feature).unwrap();

        let html = marker.popup().to_html();
        assert!(!html.contains("<script>"));
        assert!(html.starts_with("<h4>&lt;script&gt;alert(1)&lt;/script&gt;</h4>"));
        assert!(html.contains("<th>note&lt;b&gt;</th><td>a &amp; &quot;b&quot;</td>"));
    }

    #[test]
    fn test_icon_html_escapes_styling() {
        let factory = MarkerFactory::new();
        let icon = factory.icon(&DatasetId::from("odd"), "red\"><img src=x>", "fa-x");
        assert!(!icon.html.contains("<img"));
        assert!(icon.html.contains("red&quot;&gt;&lt;img src=x&gt;"));
        assert_eq!(icon.color, "red\"><img src=x>");
    }
}

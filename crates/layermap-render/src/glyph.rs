//! Cluster glyphs. Pure functions of member count and dataset styling.

use layermap_core::models::SizeThresholds;
use serde::Serialize;

use crate::html::escape_html;

/// Diameter tier of a cluster glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SizeBucket {
    Small,
    Medium,
    Large,
}

impl SizeBucket {
    pub fn for_count(count: usize, thresholds: &SizeThresholds) -> Self {
        if count <= thresholds.small_max {
            SizeBucket::Small
        } else if count <= thresholds.medium_max {
            SizeBucket::Medium
        } else {
            SizeBucket::Large
        }
    }

    /// Glyph diameter in pixels
    pub fn diameter(&self) -> u32 {
        match self {
            SizeBucket::Small => 30,
            SizeBucket::Medium => 40,
            SizeBucket::Large => 50,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            SizeBucket::Small => "marker-cluster-small",
            SizeBucket::Medium => "marker-cluster-medium",
            SizeBucket::Large => "marker-cluster-large",
        }
    }
}

/// Scale applied while a glyph is hovered
pub const HOVER_SCALE: f64 = 1.2;

/// Paint-order boost applied while a glyph is hovered
pub const HOVER_Z_OFFSET: i32 = 1000;

/// Visual description of one cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterGlyph {
    pub bucket: SizeBucket,
    pub diameter: u32,
    /// Literal member count
    pub label: String,
    pub icon: String,
    /// Fill color, always the dataset's configured color
    pub color: String,
    pub scale: f64,
    pub z_offset: i32,
}

impl ClusterGlyph {
    pub fn new(count: usize, icon: &str, color: &str, thresholds: &SizeThresholds) -> Self {
        let bucket = SizeBucket::for_count(count, thresholds);
        Self {
            bucket,
            diameter: bucket.diameter(),
            label: count.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            scale: 1.0,
            z_offset: 0,
        }
    }

    /// The same glyph in its hovered state. Cosmetic only.
    pub fn hovered(&self) -> Self {
        Self { scale: HOVER_SCALE, z_offset: HOVER_Z_OFFSET, ..self.clone() }
    }

    pub fn is_hovered(&self) -> bool {
        self.z_offset > 0
    }

    pub fn to_html(&self) -> String {
        format!(
            "<div class=\"marker-cluster {class}\" style=\"background-color:{color};\
             width:{d}px;height:{d}px;transform:scale({scale});z-index:{z}\">\
             <i class=\"fa {icon}\"></i><span>{label}</span></div>",
            class = self.bucket.css_class(),
            color = escape_html(&self.color),
            d = self.diameter,
            scale = self.scale,
            z = self.z_offset,
            icon = escape_html(&self.icon),
            label = escape_html(&self.label),
        )
    }
}

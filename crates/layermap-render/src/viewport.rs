use layermap_core::models::{Bounds, Position};
use layermap_geo::mercator;
use serde::Serialize;

/// Visible map window at an integer zoom level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    /// `[longitude, latitude]`
    pub center: Position,
    pub zoom: u8,
    /// Width and height in pixels
    pub size: [f64; 2],
    pub max_zoom: u8,
}

impl Viewport {
    pub fn new(center: Position, zoom: u8, size: [f64; 2], max_zoom: u8) -> Self {
        Self { center, zoom: zoom.min(max_zoom), size, max_zoom }
    }

    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom.min(self.max_zoom);
        self
    }

    pub fn at_max_zoom(&self) -> bool {
        self.zoom >= self.max_zoom
    }

    /// Geographic bounds of the window
    pub fn bounds(&self) -> Bounds {
        let z = f64::from(self.zoom);
        let [cx, cy] = mercator::project(self.center, z);
        let [hw, hh] = [self.size[0] / 2.0, self.size[1] / 2.0];
        let top_left = mercator::unproject([cx - hw, cy - hh], z);
        let bottom_right = mercator::unproject([cx + hw, cy + hh], z);
        Bounds::new(
            [top_left[0].max(-180.0), bottom_right[1]],
            [bottom_right[0].min(180.0), top_left[1]],
        )
    }

    /// Fit the window to `bounds`, as a cluster click does
    pub fn fit(&mut self, bounds: &Bounds) {
        self.zoom = mercator::fit_zoom(bounds, self.size, FIT_PADDING, self.max_zoom);
        self.center = bounds.center();
    }
}

/// Pixel padding kept around fitted bounds
pub const FIT_PADDING: f64 = 20.0;

impl Default for Viewport {
    /// Whole of Iraq in a 1024x768 window
    fn default() -> Self {
        Self::new([43.7, 33.2], 6, [1024.0, 768.0], 18)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_contain_center() {
        let viewport = Viewport::default();
        let bounds = viewport.bounds();
        assert!(bounds.contains(viewport.center));
        assert!(bounds.min[0] < bounds.max[0]);
        assert!(bounds.min[1] < bounds.max[1]);
    }

    #[test]
    fn test_zoom_shrinks_bounds() {
        let wide = Viewport::default().bounds();
        let narrow = Viewport::default().with_zoom(10).bounds();
        assert!(narrow.max[0] - narrow.min[0] < wide.max[0] - wide.min[0]);
    }

    #[test]
    fn test_zoom_is_capped() {
        let viewport = Viewport::default().with_zoom(30);
        assert_eq!(viewport.zoom, 18);
        assert!(viewport.at_max_zoom());
    }

    #[test]
    fn test_fit() {
        let mut viewport = Viewport::default();
        let target = Bounds::new([44.3, 33.2], [44.5, 33.4]);
        viewport.fit(&target);
        assert!(viewport.zoom > 6);
        assert_eq!(viewport.center, target.center());
        let visible = viewport.bounds();
        assert!(visible.contains(target.min) && visible.contains(target.max));
    }
}

//! Spherical web-mercator pixel math (256px tiles).

use layermap_core::models::{Bounds, Position};
use std::f64::consts::PI;

pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the square web-mercator world
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// World size in pixels at a zoom level
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Project `[lon, lat]` into world pixel coordinates at `zoom`
pub fn project(position: Position, zoom: f64) -> Position {
    let [lon, lat] = position;
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let size = world_size(zoom);
    let x = (lon + 180.0) / 360.0 * size;
    let sin = (lat * PI / 180.0).sin();
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)) * size;
    [x, y]
}

/// Inverse of [`project`]
pub fn unproject(pixel: Position, zoom: f64) -> Position {
    let size = world_size(zoom);
    let lon = pixel[0] / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * pixel[1] / size;
    let lat = (0.5 * (n.exp() - (-n).exp())).atan().to_degrees();
    [lon, lat]
}

/// Highest integer zoom, capped at `max_zoom`, at which `bounds` fits in a
/// viewport of `size` pixels with `padding` on every side
pub fn fit_zoom(bounds: &Bounds, size: [f64; 2], padding: f64, max_zoom: u8) -> u8 {
    let avail = [(size[0] - 2.0 * padding).max(1.0), (size[1] - 2.0 * padding).max(1.0)];
    for zoom in (0..=max_zoom).rev() {
        let z = f64::from(zoom);
        let min = project([bounds.min[0], bounds.max[1]], z);
        let max = project([bounds.max[0], bounds.min[1]], z);
        if max[0] - min[0] <= avail[0] && max[1] - min[1] <= avail[1] {
            return zoom;
        }
    }
    0
}

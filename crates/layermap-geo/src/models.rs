//! Conversions between layermap geometries and the `geo` crate.
//!
//! Only used on normalized (geographic) geometries: hit-testing polygons for
//! hover highlighting and deriving label anchors.

use geo::{BoundingRect, Centroid, Contains, Coord, LineString, Polygon};
use layermap_core::models::{Bounds, Geometry, Position};

fn line(positions: &[Position]) -> LineString<f64> {
    positions.iter().map(|p| Coord { x: p[0], y: p[1] }).collect()
}

fn polygon(rings: &[Vec<Position>]) -> Polygon<f64> {
    let mut rings = rings.iter().map(|r| line(r));
    let exterior = rings.next().unwrap_or_else(|| LineString::new(vec![]));
    Polygon::new(exterior, rings.collect())
}

/// Convert a canonical Geometry to a geo::Geometry
pub fn to_geo_geometry(geom: &Geometry) -> geo::Geometry<f64> {
    match geom {
        Geometry::Point { coordinates } => {
            geo::Geometry::Point(geo::Point::new(coordinates[0], coordinates[1]))
        }
        Geometry::LineString { coordinates } => geo::Geometry::LineString(line(coordinates)),
        Geometry::Polygon { coordinates } => geo::Geometry::Polygon(polygon(coordinates)),
        Geometry::MultiPoint { coordinates } => geo::Geometry::MultiPoint(
            coordinates.iter().map(|c| geo::Point::new(c[0], c[1])).collect(),
        ),
        Geometry::MultiLineString { coordinates } => geo::Geometry::MultiLineString(
            geo::MultiLineString::new(coordinates.iter().map(|l| line(l)).collect()),
        ),
        Geometry::MultiPolygon { coordinates } => geo::Geometry::MultiPolygon(
            geo::MultiPolygon::new(coordinates.iter().map(|p| polygon(p)).collect()),
        ),
        Geometry::Unsupported(_) => {
            geo::Geometry::GeometryCollection(geo::GeometryCollection::default())
        }
    }
}

/// Whether a position falls inside an areal geometry.
///
/// Points and lines never contain anything for hit-testing purposes.
pub fn hit_test(geom: &Geometry, position: Position) -> bool {
    let point = geo::Point::new(position[0], position[1]);
    match geom {
        Geometry::Polygon { coordinates } => polygon(coordinates).contains(&point),
        Geometry::MultiPolygon { coordinates } => {
            coordinates.iter().any(|p| polygon(p).contains(&point))
        }
        _ => false,
    }
}

/// Centroid suitable as a label or popup anchor
pub fn anchor(geom: &Geometry) -> Option<Position> {
    if let Some(p) = geom.as_point() {
        return Some(p);
    }
    to_geo_geometry(geom).centroid().map(|c| [c.x(), c.y()])
}

/// Bounding box computed by `geo`
pub fn bounding_box(geom: &Geometry) -> Option<Bounds> {
    to_geo_geometry(geom)
        .bounding_rect()
        .map(|rect| Bounds::new([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

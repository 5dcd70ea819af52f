//! Canonical geometry types used across all layermap crates.
//!
//! Coordinates are stored exactly as they arrive from the source. Whether a
//! pair is geographic (longitude/latitude) or projected (metres) is inferred
//! later by the normalizer and never stored on the geometry.

use serde::{Deserialize, Serialize};

/// A single `[x, y]` position
pub type Position = [f64; 2];

/// Geometry type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    /// Kept verbatim, never inspected
    Unsupported,
}

/// GeoJSON-compatible geometry representation
///
/// This enum maps directly to GeoJSON geometry types with coordinate arrays.
/// Only `Point`, `Polygon` and `MultiPolygon` take part in reprojection; the
/// remaining variants are carried through untouched. `Unsupported` holds the
/// raw GeoJSON of anything else (a `GeometryCollection`, or a geometry with
/// malformed positions) so it is written back out exactly as it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Position,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    #[serde(untagged)]
    Unsupported(serde_json::Value),
}

impl Geometry {
    /// Create a Point geometry
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point { coordinates: [x, y] }
    }

    /// Create a Polygon geometry
    pub fn polygon(rings: Vec<Vec<Position>>) -> Self {
        Geometry::Polygon { coordinates: rings }
    }

    /// Create a MultiPolygon geometry
    pub fn multi_polygon(polygons: Vec<Vec<Vec<Position>>>) -> Self {
        Geometry::MultiPolygon { coordinates: polygons }
    }

    /// Get the geometry type
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point { .. } => GeometryType::Point,
            Geometry::LineString { .. } => GeometryType::LineString,
            Geometry::Polygon { .. } => GeometryType::Polygon,
            Geometry::MultiPoint { .. } => GeometryType::MultiPoint,
            Geometry::MultiLineString { .. } => GeometryType::MultiLineString,
            Geometry::MultiPolygon { .. } => GeometryType::MultiPolygon,
            Geometry::Unsupported(_) => GeometryType::Unsupported,
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Geometry::Point { .. })
    }

    /// The point position, if this is a Point
    pub fn as_point(&self) -> Option<Position> {
        match self {
            Geometry::Point { coordinates } => Some(*coordinates),
            _ => None,
        }
    }

    /// First position encountered in traversal order: the point itself, or
    /// the first vertex of the first ring of the first polygon.
    pub fn first_position(&self) -> Option<Position> {
        match self {
            Geometry::Point { coordinates } => Some(*coordinates),
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.first().copied()
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.iter().flat_map(|ring| ring.iter()).next().copied()
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .flat_map(|poly| poly.iter())
                .flat_map(|ring| ring.iter())
                .next()
                .copied(),
            Geometry::Unsupported(_) => None,
        }
    }

    /// Visit every position mutably, in traversal order
    pub fn for_each_position_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Position),
    {
        match self {
            Geometry::Point { coordinates } => f(coordinates),
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.iter_mut().for_each(&mut f)
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.iter_mut().flat_map(|ring| ring.iter_mut()).for_each(&mut f)
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter_mut()
                .flat_map(|poly| poly.iter_mut())
                .flat_map(|ring| ring.iter_mut())
                .for_each(&mut f),
            Geometry::Unsupported(_) => {}
        }
    }

    /// Visit every position, in traversal order
    pub fn for_each_position<F>(&self, mut f: F)
    where
        F: FnMut(Position),
    {
        match self {
            Geometry::Point { coordinates } => f(*coordinates),
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.iter().for_each(|p| f(*p))
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.iter().flat_map(|ring| ring.iter()).for_each(|p| f(*p))
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .flat_map(|poly| poly.iter())
                .flat_map(|ring| ring.iter())
                .for_each(|p| f(*p)),
            Geometry::Unsupported(_) => {}
        }
    }

    /// Total number of positions in the geometry
    pub fn position_count(&self) -> usize {
        match self {
            Geometry::Point { .. } => 1,
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.len()
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.iter().map(Vec::len).sum()
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flat_map(|poly| poly.iter()).map(Vec::len).sum()
            }
            Geometry::Unsupported(_) => 0,
        }
    }

    /// Bounding box over every position, `None` for empty geometries
    pub fn bounds(&self) -> Option<Bounds> {
        let mut positions = Vec::with_capacity(self.position_count());
        self.for_each_position(|p| positions.push(p));
        Bounds::from_positions(positions)
    }

    /// Try to parse from a serde_json::Value (GeoJSON)
    pub fn from_geojson(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Convert to serde_json::Value (GeoJSON)
    pub fn to_geojson(&self) -> serde_json::Value {
        if let Geometry::Unsupported(raw) = self {
            return raw.clone();
        }
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Reason a GeoJSON geometry could not be represented
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedGeometry(pub String);

impl TryFrom<&geojson::Geometry> for Geometry {
    type Error = UnsupportedGeometry;

    /// Positions with an altitude keep only their first two ordinates.
    fn try_from(geometry: &geojson::Geometry) -> Result<Self, Self::Error> {
        fn pos(p: &[f64]) -> Result<Position, UnsupportedGeometry> {
            match p {
                [x, y, ..] => Ok([*x, *y]),
                _ => Err(UnsupportedGeometry(format!("position has {} ordinates", p.len()))),
            }
        }
        fn line(l: &[Vec<f64>]) -> Result<Vec<Position>, UnsupportedGeometry> {
            l.iter().map(|p| pos(p)).collect()
        }
        fn rings(r: &[Vec<Vec<f64>>]) -> Result<Vec<Vec<Position>>, UnsupportedGeometry> {
            r.iter().map(|l| line(l)).collect()
        }

        use geojson::Value;
        Ok(match &geometry.value {
            Value::Point(p) => Geometry::Point { coordinates: pos(p)? },
            Value::MultiPoint(ps) => Geometry::MultiPoint { coordinates: line(ps)? },
            Value::LineString(l) => Geometry::LineString { coordinates: line(l)? },
            Value::MultiLineString(ls) => Geometry::MultiLineString { coordinates: rings(ls)? },
            Value::Polygon(r) => Geometry::Polygon { coordinates: rings(r)? },
            Value::MultiPolygon(ps) => Geometry::MultiPolygon {
                coordinates: ps.iter().map(|r| rings(r)).collect::<Result<_, _>>()?,
            },
            Value::GeometryCollection(_) => {
                return Err(UnsupportedGeometry("GeometryCollection".to_string()))
            }
        })
    }
}

/// Axis-aligned bounding box in whatever coordinate space its inputs use
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    pub fn new(min: Position, max: Position) -> Self {
        Self { min, max }
    }

    pub fn from_position(p: Position) -> Self {
        Self { min: p, max: p }
    }

    /// Bounds covering every position, `None` when empty
    pub fn from_positions<I: IntoIterator<Item = Position>>(positions: I) -> Option<Self> {
        let mut iter = positions.into_iter();
        let mut bounds = Self::from_position(iter.next()?);
        for p in iter {
            bounds.extend(p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, p: Position) {
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut out = *self;
        out.extend(other.min);
        out.extend(other.max);
        out
    }

    pub fn contains(&self, p: Position) -> bool {
        p[0] >= self.min[0] && p[0] <= self.max[0] && p[1] >= self.min[1] && p[1] <= self.max[1]
    }

    pub fn center(&self) -> Position {
        [(self.min[0] + self.max[0]) / 2.0, (self.min[1] + self.max[1]) / 2.0]
    }

    /// True when every corner collapses to one position
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Whole-world geographic bounds
    pub fn world() -> Self {
        Self::new([-180.0, -90.0], [180.0, 90.0])
    }
}

//! Layermap Geo - Projection detection, reprojection, and map math
//!
//! This crate turns raw source coordinates into WGS84 longitude/latitude and
//! provides the web-mercator and geo-crate helpers used by the render stage.

pub mod mercator;
pub mod models;
pub mod normalize;
pub mod projection;

pub use normalize::{classify, CoordinateNormalizer, CoordinateSystem, NormalizeOutcome, NormalizeReport};
pub use projection::{ExactTransform, LinearApproximation, Proj4Transform};

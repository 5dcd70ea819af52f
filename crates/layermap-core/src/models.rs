pub mod dataset;
pub mod feature;
pub mod geometry;
pub mod points;

pub use dataset::{
    Category, ClusterPolicy, DatasetConfig, DatasetDescriptor, DatasetId, DatasetOrigin,
    SizeThresholds,
};
pub use feature::{parse_feature_collection, to_feature_collection, Feature, FeatureId};
pub use geometry::{Bounds, Geometry, GeometryType, Position};
pub use points::{PointCollection, PointRecord};

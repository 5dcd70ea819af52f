//! Layermap Render - Incremental marker construction and clustering
//!
//! Normalized features flow through the [`batch::BatchScheduler`] into a
//! per-dataset [`group::RenderGroup`]: either a [`cluster::ClusterEngine`]
//! for point-heavy datasets or a [`plain::PlainGroup`] for everything else.

pub mod batch;
pub mod cluster;
pub mod glyph;
pub mod group;
pub mod html;
pub mod marker;
pub mod plain;
pub mod viewport;

pub use batch::{BatchConfig, BatchReport, BatchScheduler, Progress};
pub use cluster::{Cluster, ClusterAction, ClusterEngine, ClusterId, RenderItem, SpiderLeg};
pub use glyph::{ClusterGlyph, SizeBucket};
pub use group::{GroupKind, RenderGroup};
pub use marker::{IconDescriptor, Marker, MarkerFactory, Popup};
pub use plain::{PathStyle, PlainGroup};
pub use viewport::Viewport;

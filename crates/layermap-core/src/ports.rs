//! Port trait definitions
//!
//! Adapters in `layermap-source` implement these against the file provider.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Category, DatasetDescriptor, DatasetOrigin, Feature, PointCollection};

/// Port for retrieving dataset listings and raw features
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Datasets loadable for a category (`/api/<category>-files`)
    async fn list_datasets(&self, category: &Category) -> Result<Vec<DatasetDescriptor>>;

    /// Raw, not yet normalized, features of one dataset
    async fn fetch_features(&self, origin: &DatasetOrigin) -> Result<Vec<Feature>>;

    /// Whole pre-flattened point collection (`/api/<endpoint>-data`)
    async fn fetch_points(&self, endpoint: &str) -> Result<PointCollection>;
}

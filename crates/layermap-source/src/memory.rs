//! In-memory dataset source for development and testing.
//!
//! Locks use `unwrap()`: poisoning only follows a panic in another thread
//! while it held the lock, which is unrecoverable for a test fixture.

use async_trait::async_trait;
use layermap_core::error::{LayermapError, Result};
use layermap_core::models::{
    Category, DatasetDescriptor, DatasetOrigin, Feature, PointCollection,
};
use layermap_core::ports::DatasetSource;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// In-memory implementation of DatasetSource
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    listings: Arc<RwLock<HashMap<Category, Vec<DatasetDescriptor>>>>,
    files: Arc<RwLock<HashMap<(Category, String), Vec<Feature>>>>,
    points: Arc<RwLock<HashMap<String, PointCollection>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    fetches: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch, so callers can observe in-flight loads
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Serve `features` as the file `name` of `category`
    pub fn insert_file(&self, category: Category, name: &str, features: Vec<Feature>) {
        self.files
            .write()
            .unwrap()
            .insert((category.clone(), name.to_string()), features);
    }

    pub fn insert_listing(&self, category: Category, descriptors: Vec<DatasetDescriptor>) {
        self.listings.write().unwrap().insert(category, descriptors);
    }

    /// Serve `collection` at the aggregate endpoint `endpoint`
    pub fn insert_points(&self, endpoint: &str, collection: PointCollection) {
        self.points.write().unwrap().insert(endpoint.to_string(), collection);
    }

    /// Make every fetch of the dataset or endpoint `name` fail
    pub fn fail(&self, name: &str) {
        self.failing.write().unwrap().insert(name.to_string());
    }

    pub fn recover(&self, name: &str) {
        self.failing.write().unwrap().remove(name);
    }

    /// Number of fetch calls served so far, failed ones included
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn begin_fetch(&self, name: &str) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.read().unwrap().contains(name) {
            return Err(LayermapError::Fetch {
                dataset: name.to_string(),
                reason: "simulated transport failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DatasetSource for MemorySource {
    async fn list_datasets(&self, category: &Category) -> Result<Vec<DatasetDescriptor>> {
        let listings = self.listings.read().unwrap();
        if let Some(descriptors) = listings.get(category) {
            return Ok(descriptors.clone());
        }
        drop(listings);

        // Derive a listing from the inserted files
        let mut names: Vec<String> = self
            .files
            .read()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == category)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| DatasetDescriptor {
                display_name: crate::display_name(&name),
                admin_level: crate::admin_level(&name),
                category: Some(category.to_string()),
                kind: category.to_string(),
                name,
            })
            .collect())
    }

    async fn fetch_features(&self, origin: &DatasetOrigin) -> Result<Vec<Feature>> {
        match origin {
            DatasetOrigin::File { category, name } => {
                self.begin_fetch(name).await?;
                self.files
                    .read()
                    .unwrap()
                    .get(&(category.clone(), name.clone()))
                    .cloned()
                    .ok_or_else(|| LayermapError::DatasetNotFound { name: name.clone() })
            }
            DatasetOrigin::Aggregate { endpoint, key } => {
                self.begin_fetch(key).await?;
                let collection = self.fetch_points(endpoint).await?;
                Ok(collection.features_for(key))
            }
        }
    }

    async fn fetch_points(&self, endpoint: &str) -> Result<PointCollection> {
        if self.failing.read().unwrap().contains(endpoint) {
            return Err(LayermapError::Fetch {
                dataset: endpoint.to_string(),
                reason: "simulated transport failure".to_string(),
            });
        }
        self.points
            .read()
            .unwrap()
            .get(endpoint)
            .cloned()
            .ok_or_else(|| LayermapError::DatasetNotFound { name: endpoint.to_string() })
    }
}

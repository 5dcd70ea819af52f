//! Dataset source over a directory of pre-converted GeoJSON files.
//!
//! Layout:
//!
//! ```text
//! <root>/<category>/<name>.geojson
//! <root>/<endpoint>-data.json
//! ```

use async_trait::async_trait;
use layermap_core::error::{LayermapError, Result};
use layermap_core::models::{
    parse_feature_collection, Category, DatasetDescriptor, DatasetOrigin, Feature,
    PointCollection,
};
use layermap_core::ports::DatasetSource;
use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 2] = ["geojson", "json"];

#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a category file, trying each known extension
    fn file_path(&self, category: &Category, name: &str) -> Option<PathBuf> {
        let dir = self.root.join(category.as_str());
        EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", name, ext)))
            .find(|path| path.is_file())
    }

    async fn read(&self, path: &Path, dataset: &str) -> Result<String> {
        tokio::fs::read_to_string(path).await.map_err(|e| LayermapError::Fetch {
            dataset: dataset.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })
    }
}

#[async_trait]
impl DatasetSource for DirectorySource {
    async fn list_datasets(&self, category: &Category) -> Result<Vec<DatasetDescriptor>> {
        if !self.root.is_dir() {
            return Err(LayermapError::DataDirNotFound { path: self.root.clone() });
        }

        let dir = self.root.join(category.as_str());
        if !dir.is_dir() {
            return Err(LayermapError::UnknownCategory { category: category.to_string() });
        }

        let mut stems = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let has_extension = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXTENSIONS.contains(&e));
            if !has_extension {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
        stems.sort();
        stems.dedup();

        tracing::debug!(category = %category, count = stems.len(), "Listed dataset files");

        Ok(stems
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
                let path = self.file_path(category, name).ok_or_else(|| LayermapError::Fetch {
                    dataset: name.clone(),
                    reason: format!(
                        "no {}.geojson under {}",
                        name,
                        self.root.join(category.as_str()).display()
                    ),
                })?;
                let content = self.read(&path, name).await?;
                parse_feature_collection(&content)
            }
            DatasetOrigin::Aggregate { endpoint, key } => {
                Ok(self.fetch_points(endpoint).await?.features_for(key))
            }
        }
    }

    async fn fetch_points(&self, endpoint: &str) -> Result<PointCollection> {
        let path = self.root.join(format!("{}-data.json", endpoint));
        let content = self.read(&path, endpoint).await?;
        crate::parse_points(endpoint, &content)
    }
}

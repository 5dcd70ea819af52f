//! Client for the HTTP file provider.

use async_trait::async_trait;
use layermap_core::error::{LayermapError, Result};
use layermap_core::models::{
    parse_feature_collection, Category, DatasetDescriptor, DatasetOrigin, Feature,
    PointCollection,
};
use layermap_core::ports::DatasetSource;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// HTTP implementation of DatasetSource
#[derive(Debug, Clone)]
pub struct HttpSource {
    /// Base URL of the file provider (e.g., "http://localhost:5000")
    base_url: String,

    /// HTTP client
    client: reqwest::Client,

    /// Aggregate responses, fetched once per endpoint
    points: Arc<RwLock<HashMap<String, PointCollection>>>,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            points: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `/api/<category>-files`
    pub fn listing_url(&self, category: &Category) -> String {
        format!("{}/api/{}-files", self.base_url, category)
    }

    /// `/api/<category>/<name>`
    pub fn file_url(&self, category: &Category, name: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, category, name)
    }

    /// `/api/<endpoint>-data`
    pub fn points_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}-data", self.base_url, endpoint)
    }

    /// GET `url` and return the body of a successful response
    async fn get(&self, url: &str, dataset: &str) -> Result<String> {
        tracing::debug!(url, "GET");

        let response = self.client.get(url).send().await.map_err(|e| LayermapError::Fetch {
            dataset: dataset.to_string(),
            reason: format!("Failed to connect to {}: {}", self.base_url, e),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LayermapError::Fetch {
                dataset: dataset.to_string(),
                reason: format!("HTTP {} from {}: {}", status, url, error_text),
            });
        }

        response.text().await.map_err(|e| LayermapError::Fetch {
            dataset: dataset.to_string(),
            reason: format!("Failed to read response body: {}", e),
        })
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    async fn list_datasets(&self, category: &Category) -> Result<Vec<DatasetDescriptor>> {
        let body = self.get(&self.listing_url(category), category.as_str()).await?;
        serde_json::from_str(&body).map_err(|e| {
            LayermapError::Serialization(format!("Invalid {} listing: {}", category, e))
        })
    }

    async fn fetch_features(&self, origin: &DatasetOrigin) -> Result<Vec<Feature>> {
        match origin {
            DatasetOrigin::File { category, name } => {
                let body = self.get(&self.file_url(category, name), name).await?;
                parse_feature_collection(&body)
            }
            DatasetOrigin::Aggregate { endpoint, key } => {
                Ok(self.fetch_points(endpoint).await?.features_for(key))
            }
        }
    }

    async fn fetch_points(&self, endpoint: &str) -> Result<PointCollection> {
        if let Some(cached) = self.points.read().await.get(endpoint) {
            return Ok(cached.clone());
        }

        let body = self.get(&self.points_url(endpoint), endpoint).await?;
        let collection = crate::parse_points(endpoint, &body)?;

        tracing::info!(endpoint, count = collection.count, "Fetched point collection");

        self.points
            .write()
            .await
            .entry(endpoint.to_string())
            .or_insert_with(|| collection.clone());
        Ok(collection)
    }
}

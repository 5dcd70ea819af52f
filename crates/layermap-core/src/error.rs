//! Error types for Layermap

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayermapError {
    // Dataset errors
    #[error("Dataset not found: {name}")]
    DatasetNotFound { name: String },

    #[error("Unknown dataset category: {category}")]
    UnknownCategory { category: String },

    #[error("Failed to fetch dataset {dataset}: {reason}")]
    Fetch { dataset: String, reason: String },

    #[error("Feature {feature} not found in dataset {dataset}")]
    FeatureNotFound { dataset: String, feature: String },

    #[error("Invalid geometry at feature {feature_id}: {reason}")]
    InvalidGeometry { feature_id: String, reason: String },

    // Projection errors
    #[error("Projection failed: {reason}")]
    Projection { reason: String },

    // Rendering errors
    #[error("Marker from dataset {found} cannot join a group owned by {expected}")]
    DatasetMismatch { expected: String, found: String },

    #[error("Required UI target is missing: {target}")]
    MissingTarget { target: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    #[error("Data directory not found at {path}")]
    DataDirNotFound { path: PathBuf },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LayermapError {
    /// Transport-level failures are recovered per dataset by the orchestrator
    pub fn is_transport(&self) -> bool {
        matches!(self, LayermapError::Fetch { .. } | LayermapError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, LayermapError>;

//! Dataset registry: the immutable per-dataset configuration table owned by
//! the layer orchestrator.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{LayermapError, Result};
use crate::models::{
    Category, DatasetConfig, DatasetDescriptor, DatasetId, DatasetOrigin, PointCollection,
};

/// Colors handed out to datasets that have no configured color
pub const PALETTE: [&str; 10] = [
    "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00", "#a65628", "#f781bf", "#17becf",
    "#bcbd22", "#6c757d",
];

/// Icon used when a dataset has none configured
pub const DEFAULT_ICON: &str = "fa-map-marker";

/// Deterministic palette color for a dataset identity
pub fn palette_color(id: &str) -> &'static str {
    // FNV-1a keeps the choice stable across runs
    let hash = id.bytes().fold(0xcbf29ce484222325u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x100000001b3)
    });
    PALETTE[(hash % PALETTE.len() as u64) as usize]
}

/// Ordered registry of dataset configurations keyed by identity
#[derive(Debug, Clone, Default)]
pub struct DatasetRegistry {
    configs: Vec<DatasetConfig>,
    index: HashMap<DatasetId, usize>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    datasets: Vec<DatasetConfig>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `[[datasets]]` entries from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| LayermapError::ConfigInvalid {
                key: "datasets".to_string(),
                reason: format!("Failed to read dataset registry: {}", e),
            })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(content).map_err(|e| {
            LayermapError::ConfigInvalid {
                key: "datasets".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            }
        })?;

        let mut registry = Self::new();
        for config in file.datasets {
            registry.register(config)?;
        }
        Ok(registry)
    }

    /// Add a dataset; identities must be unique
    pub fn register(&mut self, config: DatasetConfig) -> Result<()> {
        if self.index.contains_key(&config.id) {
            return Err(LayermapError::ConfigInvalid {
                key: "datasets".to_string(),
                reason: format!("Duplicate dataset id: {}", config.id),
            });
        }
        self.index.insert(config.id.clone(), self.configs.len());
        self.configs.push(config);
        Ok(())
    }

    /// Register every file of a category listing that is not yet known.
    ///
    /// A file name already taken by another category is registered as
    /// `<category>/<name>`. Returns the number of datasets added.
    pub fn register_descriptors(
        &mut self,
        category: &Category,
        descriptors: &[DatasetDescriptor],
    ) -> usize {
        let mut added = 0;
        for descriptor in descriptors {
            let plain = DatasetId::new(descriptor.name.clone());
            let id = match self.get(&plain) {
                None => plain,
                Some(existing) if existing.category == *category => continue,
                Some(existing) => {
                    let qualified = DatasetId::new(format!("{}/{}", category, descriptor.name));
                    if self.contains(&qualified) {
                        continue;
                    }
                    tracing::warn!(
                        dataset = %plain,
                        category = %category,
                        taken_by = %existing.category,
                        id = %qualified,
                        "Dataset name used by another category, registering qualified id"
                    );
                    qualified
                }
            };
            let config = DatasetConfig {
                id,
                display_name: descriptor.display_name.clone(),
                category: category.clone(),
                color: palette_color(&descriptor.name).to_string(),
                icon: DEFAULT_ICON.to_string(),
                origin: DatasetOrigin::File {
                    category: category.clone(),
                    name: descriptor.name.clone(),
                },
                service_point: false,
                cluster: None,
                chunk_size: None,
            };
            self.index.insert(config.id.clone(), self.configs.len());
            self.configs.push(config);
            added += 1;
        }
        added
    }

    /// Register one dataset per distinct `dataset` value of an aggregate
    /// point collection that is not yet known.
    pub fn register_point_datasets(&mut self, endpoint: &str, points: &PointCollection) -> usize {
        let mut added = 0;
        for key in points.dataset_keys() {
            if self.contains(&DatasetId::new(key.clone())) {
                continue;
            }
            let color = palette_color(&key);
            let config = DatasetConfig::aggregate(key, endpoint, color, DEFAULT_ICON);
            self.index.insert(config.id.clone(), self.configs.len());
            self.configs.push(config);
            added += 1;
        }
        added
    }

    pub fn get(&self, id: &DatasetId) -> Option<&DatasetConfig> {
        self.index.get(id).map(|&i| &self.configs[i])
    }

    pub fn require(&self, id: &DatasetId) -> Result<&DatasetConfig> {
        self.get(id).ok_or_else(|| LayermapError::DatasetNotFound { name: id.to_string() })
    }

    pub fn contains(&self, id: &DatasetId) -> bool {
        self.index.contains_key(id)
    }

    /// All datasets in registration order
    pub fn iter(&self) -> impl Iterator<Item = &DatasetConfig> {
        self.configs.iter()
    }

    /// Datasets of one category in registration order
    pub fn in_category<'a>(
        &'a self,
        category: &'a Category,
    ) -> impl Iterator<Item = &'a DatasetConfig> + 'a {
        self.configs.iter().filter(move |c| &c.category == category)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

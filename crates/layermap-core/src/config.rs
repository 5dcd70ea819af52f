use crate::error::{LayermapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// UTM zone 38N, the projection most Iraqi source shapefiles use
pub const DEFAULT_SOURCE_PROJECTION: &str = "+proj=utm +zone=38 +datum=WGS84 +units=m +no_defs";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Constants of the linear projected-to-geographic approximation.
///
/// `longitude = (x - false_origin_x) / meters_per_degree_lon + reference_lon`
/// and `latitude = y / meters_per_degree_lat`. Defaults are calibrated for
/// Iraq (UTM zone 38N, central meridian 45°E, ~33°N).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearApproximationConfig {
    pub false_origin_x: f64,
    pub meters_per_degree_lon: f64,
    pub reference_lon: f64,
    pub meters_per_degree_lat: f64,
}

impl Default for LinearApproximationConfig {
    fn default() -> Self {
        Self {
            false_origin_x: 500_000.0,
            meters_per_degree_lon: 93_000.0,
            reference_lon: 45.0,
            meters_per_degree_lat: 110_574.0,
        }
    }
}

/// Layered configuration for Layermap
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Base URL of the file provider, e.g. `http://localhost:5000`
    pub api_base_url: ConfigValue<String>,
    /// Root of the pre-converted GeoJSON tree
    pub data_dir: ConfigValue<PathBuf>,
    /// PROJ.4 string of the registered exact source projection; empty disables it
    pub source_projection: ConfigValue<String>,
    /// Suspension between batch chunks
    pub yield_delay_ms: ConfigValue<u64>,
    /// Progress callback throttle, in items
    pub progress_every: ConfigValue<usize>,
    pub max_zoom: ConfigValue<u8>,
    pub linear_approximation: ConfigValue<LinearApproximationConfig>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            api_base_url: ConfigValue::new(
                "http://localhost:5000".to_string(),
                ConfigSource::Default,
            ),
            data_dir: ConfigValue::new(PathBuf::from("geojson"), ConfigSource::Default),
            source_projection: ConfigValue::new(
                DEFAULT_SOURCE_PROJECTION.to_string(),
                ConfigSource::Default,
            ),
            yield_delay_ms: ConfigValue::new(10, ConfigSource::Default),
            progress_every: ConfigValue::new(500, ConfigSource::Default),
            max_zoom: ConfigValue::new(18, ConfigSource::Default),
            linear_approximation: ConfigValue::new(
                LinearApproximationConfig::default(),
                ConfigSource::Default,
            ),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| LayermapError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| LayermapError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(url) = file_config.api_base_url {
            self.api_base_url.update(url, ConfigSource::File);
        }

        if let Some(dir) = file_config.data_dir {
            self.data_dir.update(dir, ConfigSource::File);
        }

        if let Some(projection) = file_config.source_projection {
            self.source_projection.update(projection, ConfigSource::File);
        }

        if let Some(delay) = file_config.yield_delay_ms {
            self.yield_delay_ms.update(delay, ConfigSource::File);
        }

        if let Some(every) = file_config.progress_every {
            self.progress_every.update(every, ConfigSource::File);
        }

        if let Some(max_zoom) = file_config.max_zoom {
            self.max_zoom.update(max_zoom, ConfigSource::File);
        }

        if let Some(linear) = file_config.linear_approximation {
            self.linear_approximation.update(linear, ConfigSource::File);
        }

        self.validate()?;
        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // LAYERMAP_API_URL
        if let Ok(url) = env::var("LAYERMAP_API_URL") {
            self.api_base_url.update(url, ConfigSource::Environment);
        }

        // LAYERMAP_DATA_DIR
        if let Ok(dir) = env::var("LAYERMAP_DATA_DIR") {
            self.data_dir.update(PathBuf::from(dir), ConfigSource::Environment);
        }

        // LAYERMAP_SOURCE_PROJECTION
        if let Ok(projection) = env::var("LAYERMAP_SOURCE_PROJECTION") {
            self.source_projection.update(projection, ConfigSource::Environment);
        }

        // LAYERMAP_YIELD_DELAY_MS
        if let Ok(delay_str) = env::var("LAYERMAP_YIELD_DELAY_MS") {
            match delay_str.parse::<u64>() {
                Ok(delay) if delay > 0 => {
                    self.yield_delay_ms.update(delay, ConfigSource::Environment)
                }
                _ => tracing::warn!(
                    "Invalid LAYERMAP_YIELD_DELAY_MS value '{}': expected positive integer",
                    delay_str
                ),
            }
        }

        // LAYERMAP_PROGRESS_EVERY
        if let Ok(every_str) = env::var("LAYERMAP_PROGRESS_EVERY") {
            match every_str.parse::<usize>() {
                Ok(every) if every > 0 => {
                    self.progress_every.update(every, ConfigSource::Environment)
                }
                _ => tracing::warn!(
                    "Invalid LAYERMAP_PROGRESS_EVERY value '{}': expected positive integer",
                    every_str
                ),
            }
        }

        // LAYERMAP_MAX_ZOOM
        if let Ok(zoom_str) = env::var("LAYERMAP_MAX_ZOOM") {
            match parse_zoom(&zoom_str) {
                Ok(zoom) => self.max_zoom.update(zoom, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid LAYERMAP_MAX_ZOOM value '{}': expected integer 0-22",
                    zoom_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments.
    ///
    /// The merged result is validated like a config file is.
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) -> Result<()> {
        if let Some(url) = overrides.api_base_url {
            self.api_base_url.update(url, ConfigSource::Cli);
        }

        if let Some(dir) = overrides.data_dir {
            self.data_dir.update(dir, ConfigSource::Cli);
        }

        if let Some(projection) = overrides.source_projection {
            self.source_projection.update(projection, ConfigSource::Cli);
        }

        if let Some(delay) = overrides.yield_delay_ms {
            self.yield_delay_ms.update(delay, ConfigSource::Cli);
        }

        if let Some(max_zoom) = overrides.max_zoom {
            self.max_zoom.update(max_zoom, ConfigSource::Cli);
        }

        self.validate()
    }

    /// The registered exact projection, `None` when disabled
    pub fn exact_projection(&self) -> Option<&str> {
        let projection = self.source_projection.value.trim();
        (!projection.is_empty()).then_some(projection)
    }

    fn validate(&self) -> Result<()> {
        if self.yield_delay_ms.value == 0 {
            return Err(LayermapError::ConfigInvalid {
                key: "yield_delay_ms".to_string(),
                reason: "must be greater than zero to guarantee a genuine yield".to_string(),
            });
        }
        if self.progress_every.value == 0 {
            return Err(LayermapError::ConfigInvalid {
                key: "progress_every".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        let linear = &self.linear_approximation.value;
        if linear.meters_per_degree_lon <= 0.0 || linear.meters_per_degree_lat <= 0.0 {
            return Err(LayermapError::ConfigInvalid {
                key: "linear_approximation".to_string(),
                reason: "meters per degree must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "api_base_url".to_string(),
            (self.api_base_url.value.clone(), self.api_base_url.source),
        );
        map.insert(
            "data_dir".to_string(),
            (self.data_dir.value.display().to_string(), self.data_dir.source),
        );
        map.insert(
            "source_projection".to_string(),
            (self.source_projection.value.clone(), self.source_projection.source),
        );
        map.insert(
            "yield_delay_ms".to_string(),
            (self.yield_delay_ms.value.to_string(), self.yield_delay_ms.source),
        );
        map.insert(
            "progress_every".to_string(),
            (self.progress_every.value.to_string(), self.progress_every.source),
        );
        map.insert("max_zoom".to_string(), (self.max_zoom.value.to_string(), self.max_zoom.source));
        map.insert(
            "linear_approximation".to_string(),
            (format!("{:?}", self.linear_approximation.value), self.linear_approximation.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    api_base_url: Option<String>,
    data_dir: Option<PathBuf>,
    source_projection: Option<String>,
    yield_delay_ms: Option<u64>,
    progress_every: Option<usize>,
    max_zoom: Option<u8>,
    linear_approximation: Option<LinearApproximationConfig>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub api_base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub source_projection: Option<String>,
    pub yield_delay_ms: Option<u64>,
    pub max_zoom: Option<u8>,
}

/// Parse a web-map zoom level
pub fn parse_zoom(s: &str) -> Result<u8> {
    match s.trim().parse::<u8>() {
        Ok(zoom) if zoom <= 22 => Ok(zoom),
        _ => Err(LayermapError::ConfigInvalid {
            key: "max_zoom".to_string(),
            reason: format!("Invalid zoom level: {}. Use an integer between 0 and 22", s),
        }),
    }
}

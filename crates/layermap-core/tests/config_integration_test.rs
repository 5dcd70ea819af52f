//! Integration tests for layered configuration
//!
//! Precedence must be CLI arguments > environment variables > config file > defaults.

use layermap_core::config::{CliConfigOverrides, ConfigSource, LayeredConfig};
use layermap_core::registry::DatasetRegistry;
use layermap_core::models::{Category, DatasetId};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn clear_env() {
    for key in [
        "LAYERMAP_API_URL",
        "LAYERMAP_DATA_DIR",
        "LAYERMAP_SOURCE_PROJECTION",
        "LAYERMAP_YIELD_DELAY_MS",
        "LAYERMAP_PROGRESS_EVERY",
        "LAYERMAP_MAX_ZOOM",
    ] {
        env::remove_var(key);
    }
}

#[test]
fn test_partial_file_configuration() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
max_zoom = 16
# Only override zoom, leave others as defaults
"#
    )
    .unwrap();

    let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

    assert_eq!(config.max_zoom.value, 16);
    assert_eq!(config.max_zoom.source, ConfigSource::File);
    assert_eq!(config.yield_delay_ms.source, ConfigSource::Default);
    assert_eq!(config.api_base_url.value, "http://localhost:5000");
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
api_base_url = "http://file:5000"
yield_delay_ms = 20
"#
    )
    .unwrap();

    env::set_var("LAYERMAP_API_URL", "http://env:5000");
    env::set_var("LAYERMAP_DATA_DIR", "/data/geojson");

    let config = LayeredConfig::with_defaults()
        .load_from_file(file.path())
        .unwrap()
        .load_from_env();

    assert_eq!(config.api_base_url.value, "http://env:5000");
    assert_eq!(config.api_base_url.source, ConfigSource::Environment);
    assert_eq!(config.data_dir.value, PathBuf::from("/data/geojson"));
    // Untouched by the environment, so the file wins
    assert_eq!(config.yield_delay_ms.value, 20);
    assert_eq!(config.yield_delay_ms.source, ConfigSource::File);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_values_are_ignored() {
    clear_env();

    env::set_var("LAYERMAP_YIELD_DELAY_MS", "0");
    env::set_var("LAYERMAP_PROGRESS_EVERY", "lots");
    env::set_var("LAYERMAP_MAX_ZOOM", "40");

    let config = LayeredConfig::with_defaults().load_from_env();

    assert_eq!(config.yield_delay_ms.value, 10);
    assert_eq!(config.yield_delay_ms.source, ConfigSource::Default);
    assert_eq!(config.progress_every.source, ConfigSource::Default);
    assert_eq!(config.max_zoom.value, 18);

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_everything() {
    clear_env();

    env::set_var("LAYERMAP_MAX_ZOOM", "12");

    let mut config = LayeredConfig::with_defaults().load_from_env();
    assert_eq!(config.max_zoom.value, 12);

    config.update_from_cli(CliConfigOverrides {
        max_zoom: Some(19),
        source_projection: Some(String::new()),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.max_zoom.value, 19);
    assert_eq!(config.max_zoom.source, ConfigSource::Cli);
    assert_eq!(config.exact_projection(), None);

    clear_env();
}

#[test]
fn test_missing_config_file() {
    let result = LayeredConfig::with_defaults().load_from_file("/nonexistent/layermap.toml");
    assert!(result.is_err());
}

#[test]
fn test_registry_file_roundtrip() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r##"
[[datasets]]
id = "schools"
display_name = "Schools"
category = "poi"
color = "#007bff"
icon = "fa-school"
origin = {{ kind = "file", category = "poi", name = "schools" }}

[datasets.cluster]
max_cluster_radius = 60.0
disable_clustering_at_zoom = 14
zoom_to_bounds_on_click = true
spiderfy_on_max_zoom = true
size_thresholds = {{ small_max = 5, medium_max = 25 }}
"##
    )
    .unwrap();

    let registry = DatasetRegistry::load_from_file(file.path()).unwrap();
    let schools = registry.require(&DatasetId::from("schools")).unwrap();

    assert_eq!(schools.category, Category::poi());
    let policy = schools.cluster_policy();
    assert_eq!(policy.max_cluster_radius, 60.0);
    assert_eq!(policy.size_thresholds.medium_max, 25);
}

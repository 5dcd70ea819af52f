//! Integration tests for the layermap binary

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn layermap_bin() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    path.pop(); // Remove 'deps' directory
    path.push("layermap");
    path
}

fn point_collection(n: usize) -> String {
    let features: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            serde_json::json!({
                "type": "Feature",
                "properties": {"name": format!("school {}", i)},
                "geometry": {
                    "type": "Point",
                    "coordinates": [44.0 + (i % 10) as f64 * 0.01, 33.0 + (i / 10) as f64 * 0.01]
                }
            })
        })
        .collect();
    serde_json::json!({"type": "FeatureCollection", "features": features}).to_string()
}

fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let poi = dir.path().join("poi");
    fs::create_dir(&poi).unwrap();
    fs::write(poi.join("schools.geojson"), point_collection(30)).unwrap();
    fs::write(poi.join("markets.geojson"), point_collection(5)).unwrap();
    fs::write(
        dir.path().join("combined-data.json"),
        r#"{"success": true, "count": 2, "data": [
            {"name": "A", "latitude": 33.3, "longitude": 44.4, "dataset": "HERA"},
            {"name": "B", "latitude": 33.3, "longitude": 44.4, "dataset": "HERA"}
        ]}"#,
    )
    .unwrap();
    dir
}

fn run(dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = Command::new(layermap_bin())
        .arg("--data-dir")
        .arg(dir)
        .arg("--json")
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .expect("Failed to execute command");

    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

#[test]
fn test_datasets_lists_category() {
    let dir = data_dir();
    let parsed = run(dir.path(), &["datasets", "poi", "--points", "combined"]);

    let datasets = parsed["data"]["datasets"].as_array().unwrap();
    let names: Vec<_> = datasets.iter().map(|d| d["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["markets", "schools"]);
    assert_eq!(parsed["data"]["points"][0]["dataset"], "HERA");
    assert_eq!(parsed["data"]["points"][0]["points"], 2);
}

#[test]
fn test_load_reports_layers() {
    let dir = data_dir();
    let parsed = run(
        dir.path(),
        &["--yield-delay-ms", "1", "load", "--category", "poi", "--points", "combined"],
    );

    let layers = parsed["data"]["layers"].as_array().unwrap();
    assert_eq!(layers.len(), 3);
    for layer in layers {
        assert_eq!(layer["state"], "Populated");
    }

    let schools = layers.iter().find(|l| l["dataset"] == "schools").unwrap();
    assert_eq!(schools["members"], 30);
    assert_eq!(schools["kind"], "Clustered");

    let markets = layers.iter().find(|l| l["dataset"] == "markets").unwrap();
    assert_eq!(markets["kind"], "Plain");
    assert!(parsed["data"]["errors"].as_array().unwrap().is_empty());
}

#[test]
fn test_normalize_projected_file() {
    let dir = data_dir();
    let input = dir.path().join("utm.geojson");
    let output = dir.path().join("out.geojson");
    fs::write(
        &input,
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "p"},
             "geometry": {"type": "Point", "coordinates": [500000.0, 3905000.0]}}
        ]}"#,
    )
    .unwrap();

    let parsed = run(
        dir.path(),
        &[
            "normalize",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--linear-only",
        ],
    );
    assert_eq!(parsed["data"]["report"]["approximated"], 1);

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let coords = &written["features"][0]["geometry"]["coordinates"];
    let lon = coords[0].as_f64().unwrap();
    let lat = coords[1].as_f64().unwrap();
    assert!((40.0..=50.0).contains(&lon));
    assert!((30.0..=40.0).contains(&lat));
}

#[test]
fn test_load_requires_a_target() {
    let dir = data_dir();
    let output = Command::new(layermap_bin())
        .arg("--data-dir")
        .arg(dir.path())
        .arg("load")
        .output()
        .expect("Failed to execute command");
    assert!(!output.status.success());
}

#[test]
fn test_zero_yield_delay_flag_is_rejected() {
    let dir = data_dir();
    let output = Command::new(layermap_bin())
        .arg("--data-dir")
        .arg(dir.path())
        .args(["--yield-delay-ms", "0", "config"])
        .output()
        .expect("Failed to execute command");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("yield_delay_ms"));
}

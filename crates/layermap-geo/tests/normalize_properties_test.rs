//! Property tests for projection classification and reprojection

use layermap_core::config::{LayeredConfig, LinearApproximationConfig};
use layermap_core::models::{parse_feature_collection, Geometry};
use layermap_geo::{classify, CoordinateNormalizer, CoordinateSystem, LinearApproximation, NormalizeOutcome};
use proptest::prelude::*;

proptest! {
    #[test]
    fn geographic_pairs_are_left_unchanged(x in -180.0f64..=180.0, y in -90.0f64..=90.0) {
        let normalizer = CoordinateNormalizer::default();
        let mut geom = Geometry::point(x, y);
        prop_assert_eq!(normalizer.normalize(&mut geom), NormalizeOutcome::Unchanged);
        prop_assert_eq!(geom, Geometry::point(x, y));
    }

    #[test]
    fn projected_region_pairs_land_in_geographic_range(
        x in 166_000.0f64..834_000.0,
        y in 3_200_000.0f64..4_200_000.0,
    ) {
        prop_assert_eq!(classify([x, y]), CoordinateSystem::Projected);

        let normalizer = CoordinateNormalizer::new(LinearApproximation::new(LinearApproximationConfig::default()));
        let mut geom = Geometry::point(x, y);
        prop_assert_eq!(normalizer.normalize(&mut geom), NormalizeOutcome::Approximated);

        let [lon, lat] = geom.as_point().unwrap();
        prop_assert!((-180.0..=180.0).contains(&lon));
        prop_assert!((-90.0..=90.0).contains(&lat));
    }

    #[test]
    fn exact_path_lands_in_geographic_range(
        x in 200_000.0f64..800_000.0,
        y in 3_200_000.0f64..4_200_000.0,
    ) {
        let normalizer = CoordinateNormalizer::from_config(&LayeredConfig::with_defaults()).unwrap();
        let mut geom = Geometry::point(x, y);
        prop_assert_eq!(normalizer.normalize(&mut geom), NormalizeOutcome::Exact);

        let [lon, lat] = geom.as_point().unwrap();
        prop_assert!((38.0..=52.0).contains(&lon), "lon = {}", lon);
        prop_assert!((28.0..=38.5).contains(&lat), "lat = {}", lat);
    }
}

#[test]
fn utm_point_without_exact_transform_uses_linear_fallback() {
    let mut config = LayeredConfig::with_defaults();
    config.source_projection.value = String::new();
    let normalizer = CoordinateNormalizer::from_config(&config).unwrap();

    let mut geom = Geometry::point(500_000.0, 3_905_000.0);
    assert_eq!(normalizer.normalize(&mut geom), NormalizeOutcome::Approximated);

    let [lon, lat] = geom.as_point().unwrap();
    assert!((40.0..=50.0).contains(&lon), "lon = {}", lon);
    assert!((30.0..=40.0).contains(&lat), "lat = {}", lat);
}

#[test]
fn projected_feature_collection_is_normalized() {
    let content = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[440000, 3680000], [460000, 3680000], [460000, 3700000], [440000, 3680000]]]
                },
                "properties": { "ADM2_EN": "Baghdad" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [44.4, 33.3] },
                "properties": { "name": "Already geographic" }
            }
        ]
    }"#;

    let mut features = parse_feature_collection(content).unwrap();
    let normalizer = CoordinateNormalizer::from_config(&LayeredConfig::with_defaults()).unwrap();
    let report = normalizer.normalize_features(&mut features);

    assert_eq!(report.exact, 1);
    assert_eq!(report.unchanged, 1);
    features[0]
        .geometry
        .as_ref()
        .unwrap()
        .for_each_position(|p| assert_eq!(classify(p), CoordinateSystem::Geographic));
}

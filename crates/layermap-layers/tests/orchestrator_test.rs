use layermap_core::error::LayermapError;
use layermap_core::models::{
    Category, DatasetConfig, DatasetId, Feature, Geometry, PointCollection, PointRecord,
};
use layermap_core::registry::DatasetRegistry;
use layermap_geo::CoordinateNormalizer;
use layermap_layers::{
    DatasetState, LayerOrchestrator, OrchestratorSettings, StatusLevel, ToggleEvent,
};
use layermap_render::{GroupKind, RenderItem, Viewport};
use layermap_source::MemorySource;
use std::sync::Arc;
use std::time::Duration;

fn points(n: usize) -> Vec<Feature> {
    (0..n)
        .map(|i| {
            let lon = 42.0 + (i % 50) as f64 * 0.08;
            let lat = 31.0 + (i / 50) as f64 * 0.08;
            Feature::named_point(i as u64, format!("site {}", i), lon, lat)
        })
        .collect()
}

fn governorates() -> Vec<Feature> {
    (0..3)
        .map(|i| {
            let x = 42.0 + i as f64;
            let mut f = Feature::named_point(i, format!("gov {}", i), 0.0, 0.0);
            f.geometry = Some(Geometry::polygon(vec![vec![
                [x, 32.0],
                [x + 1.0, 32.0],
                [x + 1.0, 33.0],
                [x, 33.0],
                [x, 32.0],
            ]]));
            f
        })
        .collect()
}

fn hera_collection(n: usize) -> PointCollection {
    let data = (0..n)
        .map(|i| PointRecord {
            name: Some(format!("HERA {}", i)),
            latitude: Some(serde_json::json!(30.0 + (i % 60) as f64 * 0.1)),
            longitude: Some(serde_json::json!(40.0 + (i / 60) as f64 * 0.2)),
            dataset: Some("HERA".to_string()),
            extra: serde_json::Map::new(),
        })
        .collect();
    PointCollection::new(data)
}

struct Fixture {
    source: MemorySource,
    orchestrator: LayerOrchestrator,
}

fn fixture(source: MemorySource) -> Fixture {
    source.insert_file(Category::poi(), "schools", points(40));
    source.insert_file(Category::poi(), "clinics", points(25));
    source.insert_file(Category::admin(), "irq_adm1", governorates());
    source.insert_points("combined", hera_collection(2458));

    let mut registry = DatasetRegistry::new();
    registry
        .register(DatasetConfig::file("schools", Category::poi(), "#007bff", "fa-school"))
        .unwrap();
    registry
        .register(DatasetConfig::file("clinics", Category::poi(), "#dc3545", "fa-clinic-medical"))
        .unwrap();
    registry
        .register(DatasetConfig::file("irq_adm1", Category::admin(), "#3388ff", "fa-draw-polygon"))
        .unwrap();
    registry
        .register(
            DatasetConfig::aggregate("HERA", "combined", "#28a745", "fa-hospital")
                .with_service_point(true)
                .with_chunk_size(100),
        )
        .unwrap();

    let orchestrator = LayerOrchestrator::new(
        registry,
        Arc::new(source.clone()),
        CoordinateNormalizer::default(),
        OrchestratorSettings::default(),
    );
    Fixture { source, orchestrator }
}

fn id(name: &str) -> DatasetId {
    DatasetId::new(name)
}

#[tokio::test(start_paused = true)]
async fn test_show_is_idempotent() {
    let Fixture { source, mut orchestrator } = fixture(MemorySource::new());

    orchestrator.apply(ToggleEvent::Show(id("schools"))).unwrap();
    orchestrator.apply(ToggleEvent::Show(id("schools"))).unwrap();
    orchestrator.run_until_idle().await;
    orchestrator.apply(ToggleEvent::Show(id("schools"))).unwrap();
    orchestrator.run_until_idle().await;

    let status = orchestrator.status(&id("schools")).unwrap();
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(status.fetches, 1);
    assert_eq!(status.members, 40);
    assert_eq!(status.state, DatasetState::Populated);
    assert_eq!(status.kind, Some(GroupKind::Clustered));
}

#[tokio::test(start_paused = true)]
async fn test_hera_scenario() {
    let Fixture { mut orchestrator, .. } = fixture(MemorySource::new());
    let hera = id("HERA");

    orchestrator.apply(ToggleEvent::Show(hera.clone())).unwrap();
    // Nothing is attached before the first suspension point returns
    orchestrator.pump_pending();
    assert_eq!(orchestrator.status(&hera).unwrap().members, 0);
    assert_eq!(orchestrator.state(&hera), Some(DatasetState::Loading));

    orchestrator.run_until_idle().await;

    let status = orchestrator.status(&hera).unwrap();
    assert_eq!(status.state, DatasetState::Populated);
    assert_eq!(status.members, 2458);
    assert_eq!(status.chunks, 25);
    assert_eq!(status.kind, Some(GroupKind::Clustered));

    let group = orchestrator.group(&hera).unwrap();
    assert_eq!(group.engine().map(|e| e.len()), Some(2458));
    assert_eq!(orchestrator.marker_factory().cached_icons(), 1);

    let engine = group.engine().unwrap();
    let shown: usize = engine.items_at(6).iter().map(RenderItem::count).sum();
    assert_eq!(shown, 2458);
    for cluster in engine.clusters_at(6) {
        assert_eq!(cluster.glyph.color, "#28a745");
    }
}

#[tokio::test(start_paused = true)]
async fn test_hide_before_fetch_completes() {
    let source = MemorySource::new().with_delay(Duration::from_millis(200));
    let Fixture { mut orchestrator, .. } = fixture(source);
    let schools = id("schools");

    orchestrator.apply(ToggleEvent::Show(schools.clone())).unwrap();
    orchestrator.apply(ToggleEvent::Hide(schools.clone())).unwrap();
    assert!(!orchestrator.is_visible(&schools));

    orchestrator.run_until_idle().await;

    let status = orchestrator.status(&schools).unwrap();
    assert_eq!(status.state, DatasetState::Hidden);
    assert_eq!(status.members, 40);
    assert!(!orchestrator.is_attached(&schools));
    assert!(orchestrator.render(&Viewport::default()).is_empty());

    // Showing again re-attaches without a second fetch
    orchestrator.apply(ToggleEvent::Show(schools.clone())).unwrap();
    assert_eq!(orchestrator.state(&schools), Some(DatasetState::Populated));
    assert_eq!(orchestrator.status(&schools).unwrap().fetches, 1);
    assert_eq!(orchestrator.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hide_detaches_and_retains() {
    let Fixture { mut orchestrator, .. } = fixture(MemorySource::new());
    let schools = id("schools");

    orchestrator.apply(ToggleEvent::Show(schools.clone())).unwrap();
    orchestrator.run_until_idle().await;
    assert_eq!(orchestrator.render(&Viewport::default()).len(), 1);

    orchestrator.apply(ToggleEvent::Hide(schools.clone())).unwrap();
    assert_eq!(orchestrator.state(&schools), Some(DatasetState::Hidden));
    assert_eq!(orchestrator.status(&schools).unwrap().members, 40);
    assert!(orchestrator.render(&Viewport::default()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_is_isolated_and_retried() {
    let source = MemorySource::new();
    source.fail("clinics");
    let Fixture { source, mut orchestrator } = fixture(source);

    orchestrator.apply(ToggleEvent::ShowAll(Category::poi())).unwrap();
    orchestrator.run_until_idle().await;

    let clinics = orchestrator.status(&id("clinics")).unwrap();
    assert_eq!(clinics.state, DatasetState::Failed);
    assert!(clinics.visible);
    assert!(clinics.last_error.is_some());
    assert_eq!(orchestrator.state(&id("schools")), Some(DatasetState::Populated));

    let errors: Vec<_> = orchestrator.status_log().errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].dataset, Some(id("clinics")));

    // Retried on the next show
    source.recover("clinics");
    orchestrator.apply(ToggleEvent::Hide(id("clinics"))).unwrap();
    orchestrator.apply(ToggleEvent::Show(id("clinics"))).unwrap();
    orchestrator.run_until_idle().await;

    let clinics = orchestrator.status(&id("clinics")).unwrap();
    assert_eq!(clinics.state, DatasetState::Populated);
    assert_eq!(clinics.members, 25);
    assert_eq!(clinics.fetches, 2);
    assert!(clinics.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_bulk_toggles_are_idempotent() {
    let Fixture { source, mut orchestrator } = fixture(MemorySource::new());

    orchestrator.apply(ToggleEvent::Show(id("schools"))).unwrap();
    orchestrator.run_until_idle().await;
    assert_eq!(source.fetch_count(), 1);

    orchestrator.apply(ToggleEvent::ShowAll(Category::poi())).unwrap();
    orchestrator.run_until_idle().await;
    // Only the still-hidden clinics were fetched
    assert_eq!(source.fetch_count(), 2);

    orchestrator.apply(ToggleEvent::HideAll(Category::poi())).unwrap();
    orchestrator.apply(ToggleEvent::HideAll(Category::poi())).unwrap();
    assert_eq!(orchestrator.state(&id("schools")), Some(DatasetState::Hidden));
    assert_eq!(orchestrator.state(&id("clinics")), Some(DatasetState::Hidden));
    assert_eq!(orchestrator.state(&id("HERA")), Some(DatasetState::Unpopulated));
}

#[tokio::test(start_paused = true)]
async fn test_boundary_layer_is_plain_with_hover() {
    let Fixture { mut orchestrator, .. } = fixture(MemorySource::new());
    let adm1 = id("irq_adm1");

    orchestrator.apply(ToggleEvent::Show(adm1.clone())).unwrap();
    orchestrator.run_until_idle().await;

    let status = orchestrator.status(&adm1).unwrap();
    assert_eq!(status.kind, Some(GroupKind::Plain));
    assert_eq!(status.members, 3);

    let hovered = orchestrator.hover(&adm1, [43.5, 32.5]).unwrap();
    assert_eq!(hovered.map(|f| f.0), Some(1));
    assert_eq!(orchestrator.status(&adm1).unwrap().members, 3);
}

#[tokio::test(start_paused = true)]
async fn test_popup_is_built_on_request() {
    let Fixture { mut orchestrator, .. } = fixture(MemorySource::new());
    let schools = id("schools");

    orchestrator.apply(ToggleEvent::Show(schools.clone())).unwrap();
    orchestrator.run_until_idle().await;

    let feature = orchestrator.group(&schools).unwrap().engine().unwrap().markers()[3].feature;
    let popup = orchestrator.open_popup(&schools, feature).unwrap();
    assert_eq!(popup.title, "site 3");

    let marker = &orchestrator.group(&schools).unwrap().engine().unwrap().markers()[3];
    assert!(marker.has_popup());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_targets() {
    let Fixture { mut orchestrator, .. } = fixture(MemorySource::new());

    let err = orchestrator.apply(ToggleEvent::Show(id("nope"))).unwrap_err();
    assert!(matches!(err, LayermapError::DatasetNotFound { .. }));

    let err = orchestrator.apply(ToggleEvent::ShowAll(Category::new("devices"))).unwrap_err();
    assert!(matches!(err, LayermapError::MissingTarget { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_discover_registers_listings() {
    let source = MemorySource::new();
    source.insert_file(Category::admin(), "irq_adm2", governorates());
    let Fixture { mut orchestrator, .. } = fixture(source);

    let added = orchestrator.discover(&Category::admin()).await.unwrap();
    // irq_adm1 is already registered
    assert_eq!(added, 1);
    assert_eq!(orchestrator.state(&id("irq_adm2")), Some(DatasetState::Unpopulated));

    let added = orchestrator.discover_points("combined").await.unwrap();
    assert_eq!(added, 0);
}

#[tokio::test(start_paused = true)]
async fn test_progress_counts_features_without_geometry() {
    let source = MemorySource::new();
    let mut wells = points(12);
    for feature in wells.iter_mut().take(3) {
        feature.geometry = None;
    }
    source.insert_file(Category::new("water"), "wells", wells);
    let Fixture { mut orchestrator, .. } = fixture(source);
    orchestrator.discover(&Category::new("water")).await.unwrap();

    orchestrator.apply(ToggleEvent::Show(id("wells"))).unwrap();
    orchestrator.run_until_idle().await;

    let status = orchestrator.status(&id("wells")).unwrap();
    assert_eq!(status.state, DatasetState::Populated);
    assert_eq!(status.members, 9);
    let progress = status.progress.unwrap();
    assert_eq!(progress.processed, 12);
    assert_eq!(progress.total, 12);
    assert!(progress.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_destroys_everything() {
    let source = MemorySource::new().with_delay(Duration::from_millis(50));
    let Fixture { mut orchestrator, .. } = fixture(source);

    orchestrator.apply(ToggleEvent::Show(id("schools"))).unwrap();
    orchestrator.run_until_idle().await;
    orchestrator.apply(ToggleEvent::Show(id("clinics"))).unwrap();

    orchestrator.teardown();
    orchestrator.pump_pending();

    for status in orchestrator.statuses() {
        assert_eq!(status.state, DatasetState::Destroyed);
        assert_eq!(status.members, 0);
    }
    assert_eq!(orchestrator.in_flight(), 0);

    // Toggles after teardown are ignored
    orchestrator.apply(ToggleEvent::Show(id("schools"))).unwrap();
    assert_eq!(orchestrator.state(&id("schools")), Some(DatasetState::Destroyed));
    assert!(orchestrator
        .status_log()
        .iter()
        .all(|m| m.level != StatusLevel::Error));
}

//! Chunked loading of a large point dataset into a clustered group

use layermap_core::models::{DatasetConfig, Feature};
use layermap_render::{BatchConfig, BatchScheduler, GroupKind, MarkerFactory, RenderGroup, RenderItem};
use std::cell::RefCell;

fn hera_points(count: u64) -> Vec<Feature> {
    (0..count)
        .map(|i| {
            let lon = 44.0 + (i % 50) as f64 * 0.01;
            let lat = 33.0 + (i / 50) as f64 * 0.01;
            Feature::named_point(i, format!("HERA site {}", i + 1), lon, lat)
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn hera_loads_in_twenty_five_chunks() {
    let config = DatasetConfig::aggregate("HERA", "combined", "#28a745", "fa-hospital")
        .with_service_point(true)
        .with_chunk_size(100);
    let factory = MarkerFactory::new();
    let group = RefCell::new(RenderGroup::new(GroupKind::Clustered, &config, 18));
    let chunk_sizes = RefCell::new(Vec::new());

    let scheduler = BatchScheduler::new(BatchConfig::new(config.chunk_size()));
    let report = {
        let mut run = std::pin::pin!(scheduler.run(
            hera_points(2458),
            |_, chunk| {
                chunk_sizes.borrow_mut().push(chunk.len());
                group.borrow_mut().ingest(&factory, &config, chunk).unwrap();
            },
            |_| {},
        ));

        // Nothing is attached before the first suspension point returns
        assert!(futures::poll!(run.as_mut()).is_pending());
        assert_eq!(group.borrow().len(), 0);
        assert!(chunk_sizes.borrow().is_empty());

        run.await
    };

    assert_eq!(report.chunks, 25);
    assert_eq!(report.processed, 2458);

    let sizes = chunk_sizes.into_inner();
    assert_eq!(sizes.len(), 25);
    assert!(sizes[..24].iter().all(|&s| s == 100));
    assert_eq!(sizes[24], 58);

    let group = group.into_inner();
    assert_eq!(group.len(), 2458);
    assert_eq!(factory.cached_icons(), 1);

    let engine = group.engine().unwrap();
    let shown: usize = engine.items_at(6).iter().map(RenderItem::count).sum();
    assert_eq!(shown, 2458);
    assert!(engine.clusters_at(6).iter().all(|c| c.glyph.color == "#28a745"));
}

#[tokio::test(start_paused = true)]
async fn progress_reports_reach_total() {
    let scheduler = BatchScheduler::new(BatchConfig::new(50).with_progress_every(500));
    let mut seen = Vec::new();

    scheduler.run(hera_points(1234), |_, _| {}, |p| seen.push((p.processed, p.total))).await;

    assert_eq!(seen, vec![(500, 1234), (1000, 1234), (1234, 1234)]);
}

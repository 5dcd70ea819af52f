//! Background load pipeline: fetch, normalize, classify, batch.
//!
//! A load task never touches render groups. It reports each step as a
//! [`LoadEvent`] and the orchestrator attaches the chunks it receives.

use layermap_core::models::{DatasetConfig, DatasetId};
use layermap_core::ports::DatasetSource;
use layermap_geo::CoordinateNormalizer;
use layermap_render::{BatchConfig, BatchScheduler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::classify::classify;
use crate::event::LoadEvent;

/// One dataset load, ready to be spawned
pub struct LoadTask {
    pub config: DatasetConfig,
    pub source: Arc<dyn DatasetSource>,
    pub normalizer: CoordinateNormalizer,
    pub yield_delay: Duration,
    pub progress_every: usize,
    pub events: UnboundedSender<LoadEvent>,
}

impl LoadTask {
    pub async fn run(self) {
        let dataset = self.config.id.clone();
        let mut guard = TerminalGuard::new(dataset.clone(), self.events.clone());

        let mut features = match self.source.fetch_features(&self.config.origin).await {
            Ok(features) => features,
            Err(e) => {
                tracing::warn!(dataset = %dataset, error = %e, "Dataset fetch failed");
                guard.finish(LoadEvent::Failed { dataset, error: e.to_string() });
                return;
            }
        };

        let normalize = self.normalizer.normalize_features(&mut features);
        if normalize.degraded > 0 {
            tracing::warn!(
                dataset = %dataset,
                degraded = normalize.degraded,
                "Exact reprojection failed for some features; coordinates left unchanged"
            );
        }

        let kind = classify(&self.config, &features);
        let total = features.len();
        tracing::info!(dataset = %dataset, total, ?kind, "Fetched dataset");
        let _ = self.events.send(LoadEvent::Started {
            dataset: dataset.clone(),
            kind,
            total,
            normalize,
        });

        let scheduler = BatchScheduler::new(
            BatchConfig::new(self.config.chunk_size())
                .with_yield_delay(self.yield_delay)
                .with_progress_every(self.progress_every),
        );
        let events = &self.events;
        let report = scheduler
            .run(
                features,
                |index, chunk| {
                    let _ = events.send(LoadEvent::Chunk {
                        dataset: dataset.clone(),
                        index,
                        features: chunk,
                    });
                },
                |progress| {
                    let _ = events.send(LoadEvent::Progress { dataset: dataset.clone(), progress });
                },
            )
            .await;

        tracing::debug!(dataset = %dataset, chunks = report.chunks, "Batch load finished");
        guard.finish(LoadEvent::Completed { dataset, report });
    }
}

/// Sends `Failed` if a task ends without reporting, e.g. on abort or panic
struct TerminalGuard {
    dataset: DatasetId,
    events: UnboundedSender<LoadEvent>,
    done: bool,
}

impl TerminalGuard {
    fn new(dataset: DatasetId, events: UnboundedSender<LoadEvent>) -> Self {
        Self { dataset, events, done: false }
    }

    fn finish(&mut self, event: LoadEvent) {
        self.done = true;
        let _ = self.events.send(event);
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.events.send(LoadEvent::Failed {
                dataset: self.dataset.clone(),
                error: "load task ended before completing".to_string(),
            });
        }
    }
}

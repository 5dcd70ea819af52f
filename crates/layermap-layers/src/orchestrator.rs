//! The single authority over dataset toggle state.

use layermap_core::config::LayeredConfig;
use layermap_core::error::{LayermapError, Result};
use layermap_core::models::{Category, DatasetConfig, DatasetId, Feature, FeatureId, Position};
use layermap_core::ports::DatasetSource;
use layermap_core::registry::DatasetRegistry;
use layermap_geo::{CoordinateNormalizer, NormalizeReport};
use layermap_render::{
    ClusterAction, ClusterId, GroupKind, MarkerFactory, Popup, Progress, RenderGroup, RenderItem,
    Viewport,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::event::{LoadEvent, ToggleEvent};
use crate::loader::LoadTask;
use crate::state::{DatasetState, LayerStatus};
use crate::status::{StatusLog, DEFAULT_CAPACITY};

/// Runtime knobs shared by every load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub yield_delay: Duration,
    pub progress_every: usize,
    pub max_zoom: u8,
    pub status_capacity: usize,
}

impl OrchestratorSettings {
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            yield_delay: Duration::from_millis(config.yield_delay_ms.value),
            progress_every: config.progress_every.value,
            max_zoom: config.max_zoom.value,
            status_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            yield_delay: Duration::from_millis(10),
            progress_every: 500,
            max_zoom: 18,
            status_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// What one attached dataset shows in a viewport
#[derive(Debug)]
pub struct LayerView<'a> {
    pub dataset: &'a DatasetId,
    /// Markers and clusters inside the viewport
    pub items: Vec<RenderItem<'a>>,
    /// Unclustered shapes
    pub shapes: &'a [Feature],
}

#[derive(Debug)]
struct Layer {
    config: DatasetConfig,
    visible: bool,
    state: DatasetState,
    group: Option<RenderGroup>,
    progress: Option<Progress>,
    chunks: usize,
    normalize: Option<NormalizeReport>,
    fetches: usize,
    last_error: Option<String>,
}

impl Layer {
    fn new(config: DatasetConfig) -> Self {
        Self {
            config,
            visible: false,
            state: DatasetState::Unpopulated,
            group: None,
            progress: None,
            chunks: 0,
            normalize: None,
            fetches: 0,
            last_error: None,
        }
    }

    /// Whether the group is on the viewport. Chunks of a visible load
    /// appear as they are attached.
    fn is_attached(&self) -> bool {
        self.visible
            && self.group.is_some()
            && matches!(self.state, DatasetState::Loading | DatasetState::Populated)
    }

    fn status(&self) -> LayerStatus {
        LayerStatus {
            dataset: self.config.id.clone(),
            display_name: self.config.display_name.clone(),
            visible: self.visible,
            state: self.state,
            kind: self.group.as_ref().map(RenderGroup::kind),
            members: self.group.as_ref().map_or(0, RenderGroup::len),
            progress: self.progress,
            chunks: self.chunks,
            normalize: self.normalize,
            fetches: self.fetches,
            last_error: self.last_error.clone(),
        }
    }
}

/// Coordinates toggles, loads and render groups for every dataset
pub struct LayerOrchestrator {
    registry: DatasetRegistry,
    source: Arc<dyn DatasetSource>,
    normalizer: CoordinateNormalizer,
    factory: MarkerFactory,
    settings: OrchestratorSettings,
    layers: HashMap<DatasetId, Layer>,
    tasks: HashMap<DatasetId, JoinHandle<()>>,
    events_tx: UnboundedSender<LoadEvent>,
    events_rx: UnboundedReceiver<LoadEvent>,
    status: StatusLog,
    torn_down: bool,
}

impl LayerOrchestrator {
    pub fn new(
        registry: DatasetRegistry,
        source: Arc<dyn DatasetSource>,
        normalizer: CoordinateNormalizer,
        settings: OrchestratorSettings,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut orchestrator = Self {
            registry,
            source,
            normalizer,
            factory: MarkerFactory::new(),
            settings,
            layers: HashMap::new(),
            tasks: HashMap::new(),
            events_tx,
            events_rx,
            status: StatusLog::new(settings.status_capacity),
            torn_down: false,
        };
        orchestrator.sync_layers();
        orchestrator
    }

    /// Create a layer for every registry entry that has none
    fn sync_layers(&mut self) {
        for config in self.registry.iter() {
            if !self.layers.contains_key(&config.id) {
                self.layers.insert(config.id.clone(), Layer::new(config.clone()));
            }
        }
    }

    /// Register every dataset the source lists for `category`.
    ///
    /// Returns the number of new datasets.
    pub async fn discover(&mut self, category: &Category) -> Result<usize> {
        let descriptors = self.source.list_datasets(category).await?;
        let added = self.registry.register_descriptors(category, &descriptors);
        self.sync_layers();
        tracing::info!(category = %category, added, "Discovered datasets");
        Ok(added)
    }

    /// Register one dataset per distinct `dataset` value of an aggregate
    /// point endpoint
    pub async fn discover_points(&mut self, endpoint: &str) -> Result<usize> {
        let points = self.source.fetch_points(endpoint).await?;
        let added = self.registry.register_point_datasets(endpoint, &points);
        self.sync_layers();
        tracing::info!(endpoint, added, "Discovered point datasets");
        Ok(added)
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn marker_factory(&self) -> &MarkerFactory {
        &self.factory
    }

    pub fn status_log(&self) -> &StatusLog {
        &self.status
    }

    /// Apply a panel interaction to the state table
    pub fn apply(&mut self, event: ToggleEvent) -> Result<()> {
        match event {
            ToggleEvent::Show(id) => self.show(&id),
            ToggleEvent::Hide(id) => self.hide(&id),
            ToggleEvent::ShowAll(category) => {
                for id in self.panel(&category)? {
                    self.show(&id)?;
                }
                Ok(())
            }
            ToggleEvent::HideAll(category) => {
                for id in self.panel(&category)? {
                    self.hide(&id)?;
                }
                Ok(())
            }
        }
    }

    /// Dataset ids of a category panel, in registry order
    fn panel(&self, category: &Category) -> Result<Vec<DatasetId>> {
        let ids: Vec<DatasetId> =
            self.registry.in_category(category).map(|c| c.id.clone()).collect();
        if ids.is_empty() {
            return Err(LayermapError::MissingTarget {
                target: format!("layer panel for category {}", category),
            });
        }
        Ok(ids)
    }

    fn layer_mut(&mut self, id: &DatasetId) -> Result<&mut Layer> {
        self.layers
            .get_mut(id)
            .ok_or_else(|| LayermapError::DatasetNotFound { name: id.to_string() })
    }

    fn show(&mut self, id: &DatasetId) -> Result<()> {
        let layer = self.layer_mut(id)?;
        match layer.state {
            DatasetState::Unpopulated | DatasetState::Failed => {
                layer.visible = true;
                layer.state = DatasetState::Loading;
                layer.group = None;
                layer.progress = None;
                layer.chunks = 0;
                layer.last_error = None;
                layer.fetches += 1;
                let config = layer.config.clone();
                self.spawn_load(config);
            }
            DatasetState::Loading => layer.visible = true,
            DatasetState::Hidden => {
                layer.visible = true;
                layer.state = DatasetState::Populated;
                tracing::debug!(dataset = %id, "Re-attached render group");
            }
            DatasetState::Populated => {}
            DatasetState::Destroyed => {
                tracing::debug!(dataset = %id, "Ignoring show after teardown");
            }
        }
        Ok(())
    }

    fn hide(&mut self, id: &DatasetId) -> Result<()> {
        let layer = self.layer_mut(id)?;
        if layer.state == DatasetState::Destroyed {
            return Ok(());
        }
        layer.visible = false;
        if layer.state == DatasetState::Populated {
            layer.state = DatasetState::Hidden;
            tracing::debug!(dataset = %id, "Detached render group");
        }
        Ok(())
    }

    fn spawn_load(&mut self, config: DatasetConfig) {
        tracing::info!(dataset = %config.id, "Loading dataset");
        let id = config.id.clone();
        let task = LoadTask {
            config,
            source: Arc::clone(&self.source),
            normalizer: self.normalizer.clone(),
            yield_delay: self.settings.yield_delay,
            progress_every: self.settings.progress_every,
            events: self.events_tx.clone(),
        };
        self.tasks.insert(id, tokio::spawn(task.run()));
    }

    /// Number of loads still running
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for the next load event and apply it.
    ///
    /// Returns the status of the dataset it touched, or `None` when no
    /// load is in flight.
    pub async fn pump(&mut self) -> Option<LayerStatus> {
        if self.tasks.is_empty() {
            return None;
        }
        let event = self.events_rx.recv().await?;
        Some(self.handle(event))
    }

    /// Apply every load event that has already arrived, without waiting
    pub fn pump_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            applied += 1;
        }
        applied
    }

    /// Apply load events until every in-flight load has finished
    pub async fn run_until_idle(&mut self) {
        while self.pump().await.is_some() {}
    }

    fn handle(&mut self, event: LoadEvent) -> LayerStatus {
        let id = event.dataset().clone();
        if event.is_terminal() {
            self.tasks.remove(&id);
        }

        let max_zoom = self.settings.max_zoom;
        let Some(layer) = self.layers.get_mut(&id) else {
            tracing::warn!(dataset = %id, "Load event for unknown dataset");
            return LayerStatus {
                dataset: id.clone(),
                display_name: id.to_string(),
                visible: false,
                state: DatasetState::Destroyed,
                kind: None,
                members: 0,
                progress: None,
                chunks: 0,
                normalize: None,
                fetches: 0,
                last_error: None,
            };
        };
        if layer.state != DatasetState::Loading {
            tracing::debug!(dataset = %id, state = %layer.state, "Dropping stale load event");
            return layer.status();
        }

        match event {
            LoadEvent::Started { kind, total, normalize, .. } => {
                layer.group = Some(RenderGroup::new(kind, &layer.config, max_zoom));
                layer.progress = Some(Progress { processed: 0, total });
                layer.normalize = Some(normalize);
                if normalize.approximated > 0 {
                    self.status.warning(
                        &id,
                        format!(
                            "{}: {} features reprojected with the linear approximation",
                            layer.config.display_name, normalize.approximated
                        ),
                    );
                }
                if normalize.degraded > 0 {
                    self.status.warning(
                        &id,
                        format!(
                            "{}: {} features kept their original coordinates",
                            layer.config.display_name, normalize.degraded
                        ),
                    );
                }
                if kind == GroupKind::Clustered {
                    tracing::debug!(dataset = %id, total, "Clustering dataset");
                }
            }
            LoadEvent::Chunk { index, features, .. } => {
                let Some(group) = layer.group.as_mut() else {
                    tracing::warn!(dataset = %id, chunk = index, "Chunk before start");
                    return layer.status();
                };
                let received = features.len();
                match group.ingest(&self.factory, &layer.config, features) {
                    Ok(added) => {
                        if added < received {
                            tracing::debug!(
                                dataset = %id,
                                chunk = index,
                                skipped = received - added,
                                "Features without a renderable geometry"
                            );
                        }
                    }
                    Err(e) => tracing::error!(dataset = %id, chunk = index, error = %e, "Chunk rejected"),
                }
                layer.chunks += 1;
                if let Some(progress) = layer.progress.as_mut() {
                    progress.processed += received;
                }
            }
            LoadEvent::Progress { progress, .. } => {
                tracing::debug!(
                    dataset = %id,
                    processed = progress.processed,
                    total = progress.total,
                    "Load progress"
                );
            }
            LoadEvent::Completed { report, .. } => {
                layer.state =
                    if layer.visible { DatasetState::Populated } else { DatasetState::Hidden };
                let members = layer.group.as_ref().map_or(0, RenderGroup::len);
                tracing::info!(
                    dataset = %id,
                    members,
                    chunks = report.chunks,
                    state = %layer.state,
                    "Dataset loaded"
                );
                self.status.info(
                    &id,
                    format!("Loaded {} ({} features)", layer.config.display_name, members),
                );
            }
            LoadEvent::Failed { error, .. } => {
                tracing::error!(dataset = %id, error = %error, "Dataset load failed");
                layer.state = DatasetState::Failed;
                layer.group = None;
                layer.progress = None;
                self.status.error(
                    &id,
                    format!("Failed to load {}: {}", layer.config.display_name, error),
                );
                layer.last_error = Some(error);
            }
        }
        layer.status()
    }

    pub fn status(&self, id: &DatasetId) -> Option<LayerStatus> {
        self.layers.get(id).map(Layer::status)
    }

    /// Every layer in registry order
    pub fn statuses(&self) -> Vec<LayerStatus> {
        self.registry
            .iter()
            .filter_map(|config| self.layers.get(&config.id))
            .map(Layer::status)
            .collect()
    }

    pub fn state(&self, id: &DatasetId) -> Option<DatasetState> {
        self.layers.get(id).map(|l| l.state)
    }

    pub fn is_visible(&self, id: &DatasetId) -> bool {
        self.layers.get(id).is_some_and(|l| l.visible)
    }

    /// Whether the dataset's group is currently on the viewport
    pub fn is_attached(&self, id: &DatasetId) -> bool {
        self.layers.get(id).is_some_and(Layer::is_attached)
    }

    pub fn group(&self, id: &DatasetId) -> Option<&RenderGroup> {
        self.layers.get(id).and_then(|l| l.group.as_ref())
    }

    /// What every attached dataset shows in `viewport`, in registry order
    pub fn render(&self, viewport: &Viewport) -> Vec<LayerView<'_>> {
        self.registry
            .iter()
            .filter_map(|config| self.layers.get(&config.id))
            .filter(|layer| layer.is_attached())
            .filter_map(|layer| {
                let group = layer.group.as_ref()?;
                let items = match group.engine() {
                    Some(engine) => engine.render(viewport),
                    None => {
                        let bounds = viewport.bounds();
                        group
                            .shapes()
                            .markers()
                            .iter()
                            .filter(|m| bounds.contains(m.position))
                            .map(RenderItem::Marker)
                            .collect()
                    }
                };
                Some(LayerView { dataset: &layer.config.id, items, shapes: group.shapes().shapes() })
            })
            .collect()
    }

    /// Resolve a click on a cluster of an attached dataset
    pub fn click_cluster(
        &self,
        id: &DatasetId,
        cluster: ClusterId,
        viewport: &Viewport,
    ) -> Result<ClusterAction> {
        let Some(engine) = self.attached_group(id)?.engine() else {
            return Ok(ClusterAction::Ignore);
        };
        Ok(engine
            .cluster(cluster)
            .map_or(ClusterAction::Ignore, |c| engine.click(&c, viewport)))
    }

    /// Popup of a leaf marker, built on first request
    pub fn open_popup(&self, id: &DatasetId, feature: FeatureId) -> Result<&Popup> {
        let group = self.attached_group(id)?;
        let marker = match group.engine() {
            Some(engine) => engine.markers().iter().find(|m| m.feature == feature),
            None => None,
        }
        .or_else(|| group.shapes().markers().iter().find(|m| m.feature == feature));

        marker.map(|m| m.popup()).ok_or_else(|| LayermapError::FeatureNotFound {
            dataset: id.to_string(),
            feature: feature.0.to_string(),
        })
    }

    /// Move the pointer over an attached dataset's shapes
    pub fn hover(&mut self, id: &DatasetId, position: Position) -> Result<Option<FeatureId>> {
        let layer = self.layer_mut(id)?;
        if !layer.is_attached() {
            return Ok(None);
        }
        Ok(layer.group.as_mut().and_then(|group| group.shapes_mut().hover(position)))
    }

    fn attached_group(&self, id: &DatasetId) -> Result<&RenderGroup> {
        let layer =
            self.layers.get(id).ok_or_else(|| LayermapError::DatasetNotFound { name: id.to_string() })?;
        if !layer.is_attached() {
            return Err(LayermapError::MissingTarget { target: format!("attached layer {}", id) });
        }
        layer.group.as_ref().ok_or_else(|| LayermapError::MissingTarget {
            target: format!("render group for {}", id),
        })
    }

    /// Free every render group and stop all loads. Final.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
        for layer in self.layers.values_mut() {
            if let Some(group) = layer.group.as_mut() {
                group.clear();
            }
            layer.group = None;
            layer.visible = false;
            layer.state = DatasetState::Destroyed;
        }
        self.torn_down = true;
        tracing::info!(layers = self.layers.len(), "Layer orchestrator torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl Drop for LayerOrchestrator {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

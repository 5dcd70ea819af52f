use layermap_core::models::DatasetId;
use layermap_geo::NormalizeReport;
use layermap_render::{GroupKind, Progress};
use serde::Serialize;

/// Lifecycle of one dataset's render group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DatasetState {
    /// Never loaded
    Unpopulated,
    /// A load task is fetching or feeding chunks
    Loading,
    /// Fully loaded and attached to the viewport
    Populated,
    /// Fully loaded, detached, retained in memory
    Hidden,
    /// The last fetch failed; the next show retries
    Failed,
    /// Freed by teardown
    Destroyed,
}

impl DatasetState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, DatasetState::Populated | DatasetState::Hidden)
    }
}

impl std::fmt::Display for DatasetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DatasetState::Unpopulated => "unpopulated",
            DatasetState::Loading => "loading",
            DatasetState::Populated => "visible",
            DatasetState::Hidden => "hidden",
            DatasetState::Failed => "failed",
            DatasetState::Destroyed => "destroyed",
        };
        f.write_str(label)
    }
}

/// Snapshot of one layer for observers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStatus {
    pub dataset: DatasetId,
    pub display_name: String,
    /// Checkbox state
    pub visible: bool,
    pub state: DatasetState,
    pub kind: Option<GroupKind>,
    /// Markers and shapes attached to the group so far
    pub members: usize,
    pub progress: Option<Progress>,
    pub chunks: usize,
    pub normalize: Option<NormalizeReport>,
    pub fetches: usize,
    pub last_error: Option<String>,
}

use layermap_core::models::{Category, DatasetId, Feature};
use layermap_geo::NormalizeReport;
use layermap_render::{BatchReport, GroupKind, Progress};

/// A user interaction with the layer panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleEvent {
    /// Dataset checkbox checked
    Show(DatasetId),
    /// Dataset checkbox cleared
    Hide(DatasetId),
    /// "Load all" for a category
    ShowAll(Category),
    /// "Clear all" for a category
    HideAll(Category),
}

/// Report from a background load task.
///
/// Every task ends with exactly one `Completed` or `Failed`.
#[derive(Debug)]
pub enum LoadEvent {
    /// Features fetched, normalized and classified
    Started { dataset: DatasetId, kind: GroupKind, total: usize, normalize: NormalizeReport },

    /// One batch chunk, in order
    Chunk { dataset: DatasetId, index: usize, features: Vec<Feature> },

    /// Throttled batch progress
    Progress { dataset: DatasetId, progress: Progress },

    Completed { dataset: DatasetId, report: BatchReport },

    Failed { dataset: DatasetId, error: String },
}

impl LoadEvent {
    pub fn dataset(&self) -> &DatasetId {
        match self {
            LoadEvent::Started { dataset, .. }
            | LoadEvent::Chunk { dataset, .. }
            | LoadEvent::Progress { dataset, .. }
            | LoadEvent::Completed { dataset, .. }
            | LoadEvent::Failed { dataset, .. } => dataset,
        }
    }

    /// Whether this is the last event of its task
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadEvent::Completed { .. } | LoadEvent::Failed { .. })
    }
}

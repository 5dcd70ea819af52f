//! Layermap Layers - The layer orchestrator
//!
//! One [`LayerOrchestrator`] owns the toggle, state and render group of every
//! registered dataset. UI interactions arrive as [`ToggleEvent`]s; dataset
//! loads run as background tasks that report back through [`LoadEvent`]s,
//! which the orchestrator applies to its state table when pumped.

pub mod classify;
pub mod event;
pub mod loader;
pub mod orchestrator;
pub mod state;
pub mod status;

pub use classify::classify;
pub use event::{LoadEvent, ToggleEvent};
pub use orchestrator::{LayerOrchestrator, LayerView, OrchestratorSettings};
pub use state::{DatasetState, LayerStatus};
pub use status::{StatusLevel, StatusLog, StatusMessage};

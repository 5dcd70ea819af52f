use layermap_core::models::{DatasetConfig, Feature};
use layermap_render::GroupKind;

/// Datasets with this many features or fewer never cluster on point share
pub const MIN_CLUSTER_FEATURES: usize = 10;

/// Decide how a dataset renders.
///
/// Service-point datasets always cluster. Any other dataset clusters when
/// more than 80% of its features are points and it has more than
/// [`MIN_CLUSTER_FEATURES`] features.
pub fn classify(config: &DatasetConfig, features: &[Feature]) -> GroupKind {
    if config.service_point {
        return GroupKind::Clustered;
    }

    let total = features.len();
    let points = features.iter().filter(|f| f.is_point()).count();
    if total > MIN_CLUSTER_FEATURES && points * 5 > total * 4 {
        GroupKind::Clustered
    } else {
        GroupKind::Plain
    }
}

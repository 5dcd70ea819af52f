//! Layermap Source - Adapters for the dataset file provider
//!
//! Every adapter implements [`layermap_core::ports::DatasetSource`]:
//! - [`MemorySource`] holds datasets in memory (tests, demos)
//! - [`DirectorySource`] reads a tree of pre-converted GeoJSON files
//! - [`HttpSource`] talks to the HTTP file provider

pub mod directory;
pub mod http;
pub mod memory;

pub use directory::DirectorySource;
pub use http::HttpSource;
pub use memory::MemorySource;

use layermap_core::error::{LayermapError, Result};
use layermap_core::models::PointCollection;

/// Decode an aggregate `{success, count, data}` body. A provider that
/// reports `success: false` is a fetch failure, whatever `data` holds.
pub(crate) fn parse_points(endpoint: &str, body: &str) -> Result<PointCollection> {
    let collection: PointCollection = serde_json::from_str(body).map_err(|e| {
        LayermapError::Serialization(format!("Invalid {} point collection: {}", endpoint, e))
    })?;

    if !collection.success {
        return Err(LayermapError::Fetch {
            dataset: endpoint.to_string(),
            reason: "provider reported success = false".to_string(),
        });
    }
    Ok(collection)
}

/// Human readable name for a dataset file stem, e.g. `irq_health_sites`
/// becomes `Irq Health Sites`
pub fn display_name(stem: &str) -> String {
    stem.split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Administrative level encoded in a file stem as `adm<N>`
pub fn admin_level(stem: &str) -> Option<String> {
    let lower = stem.to_ascii_lowercase();
    lower.match_indices("adm").find_map(|(idx, _)| {
        let digits: String =
            lower[idx + 3..].chars().take_while(char::is_ascii_digit).collect();
        (!digits.is_empty()).then_some(digits)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("irq_health_sites"), "Irq Health Sites");
        assert_eq!(display_name("schools"), "Schools");
        assert_eq!(display_name("a__b"), "A B");
    }

    #[test]
    fn test_admin_level() {
        assert_eq!(admin_level("irq_admbnda_adm1_cso").as_deref(), Some("1"));
        assert_eq!(admin_level("irq_adm2").as_deref(), Some("2"));
        assert_eq!(admin_level("ADM3_boundaries").as_deref(), Some("3"));
        assert_eq!(admin_level("schools"), None);
    }
}

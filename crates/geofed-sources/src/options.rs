use serde::{Deserialize, Serialize};

/// Spatial relation between a feature and the active spatial filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialRelation {
    #[default]
    Intersects,
    Within,
}

/// User-configurable search settings, passed by value into every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOptions {
    /// Restrict the search to the layers currently visible on the map
    pub search_in_visible_layers: bool,
    pub wildcard_at_start: bool,
    pub wildcard_at_end: bool,
    pub match_case: bool,
    pub active_spatial_filter: SpatialRelation,
    pub enable_label_on_highlight: bool,
    /// Maximum features fetched per dataset; `0` means unlimited
    pub max_results_per_dataset: usize,
    /// Let the fetch layer try word permutations of multi-word phrases
    pub get_possible_combinations: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search_in_visible_layers: false,
            wildcard_at_start: false,
            wildcard_at_end: true,
            match_case: false,
            active_spatial_filter: SpatialRelation::Intersects,
            enable_label_on_highlight: true,
            max_results_per_dataset: 100,
            get_possible_combinations: false,
        }
    }
}

impl SearchOptions {
    /// Options for an exact-phrase request: no wildcards, no permutations.
    #[must_use]
    pub fn exact(&self) -> Self {
        Self {
            wildcard_at_start: false,
            wildcard_at_end: false,
            get_possible_combinations: false,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_overrides_wildcards_only() {
        let options = SearchOptions {
            wildcard_at_start: true,
            wildcard_at_end: true,
            get_possible_combinations: true,
            match_case: true,
            ..SearchOptions::default()
        };
        let exact = options.exact();

        assert!(!exact.wildcard_at_start);
        assert!(!exact.wildcard_at_end);
        assert!(!exact.get_possible_combinations);
        assert!(exact.match_case);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: SearchOptions =
            serde_json::from_str(r#"{"matchCase": true, "activeSpatialFilter": "within"}"#).unwrap();

        assert!(options.match_case);
        assert_eq!(options.active_spatial_filter, SpatialRelation::Within);
        assert!(options.wildcard_at_end);
    }
}

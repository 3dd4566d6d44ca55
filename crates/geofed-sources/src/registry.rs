//! Static list of queryable sources.
//!
//! The registry is loaded once (from code or a JSON configuration file) and is
//! read-only afterwards; the search subsystem never mutates sources.

use std::path::Path;

use ahash::AHashMap as HashMap;
use tracing::{info, instrument};

use crate::{Result, Source, SourceError};

#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
    by_id: HashMap<String, usize>,
}

impl SourceRegistry {
    /// Build a registry, rejecting duplicate ids and sources without search fields.
    pub fn new(sources: Vec<Source>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(sources.len());
        for (idx, source) in sources.iter().enumerate() {
            if source.search_fields.is_empty() {
                return Err(SourceError::NoSearchFields(source.id.clone()));
            }
            if by_id.insert(source.id.clone(), idx).is_some() {
                return Err(SourceError::DuplicateSourceId(source.id.clone()));
            }
        }
        Ok(Self { sources, by_id })
    }

    /// Parse a JSON array of source definitions.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let sources: Vec<Source> = serde_json::from_str(json)?;
        Self::new(sources)
    }

    #[instrument(name = "Load source registry", level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let registry = Self::from_json_str(&json)?;
        info!(sources = registry.len(), "Source registry loaded");
        Ok(registry)
    }

    pub fn get_all(&self) -> &[Source] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&Source> {
        self.by_id.get(id).map(|&idx| &self.sources[idx])
    }

    /// Sources for the given ids, in the order of `ids`. Unknown ids are skipped.
    pub fn get_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Source> {
        ids.iter()
            .filter_map(|id| self.get(id.as_ref()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::test_data;

    #[test]
    fn test_get_by_ids_preserves_requested_order() {
        let registry = test_data::sample_registry();
        let ids: Vec<String> = registry
            .get_by_ids(&["parks", "addresses"])
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["parks", "addresses"]);
    }

    #[test]
    fn test_get_by_ids_skips_unknown() {
        let registry = test_data::sample_registry();
        let sources = registry.get_by_ids(&["nope", "parks", "also-nope"]);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, "parks");

        let none: Vec<String> = Vec::new();
        assert!(registry.get_by_ids(&none).is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let a = Source::new("a", "A").with_search_fields(["name"]);
        let result = SourceRegistry::new(vec![a.clone(), a]);
        assert!(matches!(result, Err(SourceError::DuplicateSourceId(id)) if id == "a"));
    }

    #[test]
    fn test_missing_search_fields_rejected() {
        let result = SourceRegistry::new(vec![Source::new("a", "A")]);
        assert!(matches!(result, Err(SourceError::NoSearchFields(_))));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "roads", "caption": "Roads", "searchFields": ["name"], "displayFields": ["name"]}}]"#
        )
        .unwrap();

        let registry = SourceRegistry::from_path(file.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("roads").unwrap().caption, "Roads");
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = SourceRegistry::from_path("/definitely/not/here.json");
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}

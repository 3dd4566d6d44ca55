//! Capabilities the coordinator consumes from the outside world.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{FeatureCollectionResult, FetchFailure, SearchOptions, Source, SpatialFilter};

/// Everything a fetch needs besides the sources to query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// The phrase with exact-match quotes already stripped
    pub phrase: String,
    pub options: SearchOptions,
    pub spatial_filter: Option<SpatialFilter>,
    /// True for type-ahead requests; fetchers may return lighter payloads
    pub autocomplete: bool,
}

impl FetchRequest {
    pub fn new(phrase: impl Into<String>, options: SearchOptions) -> Self {
        Self {
            phrase: phrase.into(),
            options,
            spatial_filter: None,
            autocomplete: false,
        }
    }

    #[must_use]
    pub fn with_spatial_filter(mut self, filter: Option<SpatialFilter>) -> Self {
        self.spatial_filter = filter;
        self
    }

    #[must_use]
    pub fn for_autocomplete(mut self, autocomplete: bool) -> Self {
        self.autocomplete = autocomplete;
        self
    }
}

/// Result of one fetch call. Per-source problems go into `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub feature_collections: Vec<FeatureCollectionResult>,
    pub errors: Vec<FetchFailure>,
}

impl FetchResponse {
    pub fn new(feature_collections: Vec<FeatureCollectionResult>) -> Self {
        Self {
            feature_collections,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<FetchFailure>) -> Self {
        self.errors = errors;
        self
    }

    /// Concatenate `other` after `self`.
    pub fn extend(&mut self, other: Self) {
        self.feature_collections.extend(other.feature_collections);
        self.errors.extend(other.errors);
    }
}

/// The batched, WFS-like feature fetch.
///
/// Implementations report per-source failures inside [`FetchResponse::errors`] and
/// only return `Err` for failures that void the whole batch.
#[async_trait]
pub trait FeatureFetcher: Send + Sync {
    async fn fetch_features(
        &self,
        sources: &[Source],
        request: &FetchRequest,
    ) -> anyhow::Result<FetchResponse>;
}

/// Layers currently visible on the map. Queried fresh on every fetch.
pub trait VisibleLayers: Send + Sync {
    fn visible_search_layers(&self) -> Vec<Source>;
}

/// Fixed visible-layer set, useful for hosts without a map and for tests.
impl VisibleLayers for Vec<Source> {
    fn visible_search_layers(&self) -> Vec<Source> {
        self.clone()
    }
}

//! In-memory [`FeatureFetcher`] backend.
//!
//! Holds a feature list per source id and evaluates the search options locally:
//! wildcard placement, case sensitivity, word permutations, the per-dataset result
//! limit and the spatial relation. Spatial relations are evaluated on bounding
//! boxes, which is exact for extents and an over-approximation for drawn shapes.

use ahash::AHashMap as HashMap;
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::{
    BoundingBox, Feature, FeatureCollectionResult, FeatureFetcher, FetchFailure, FetchRequest,
    FetchResponse, Origin, SearchOptions, Source, SpatialFilter, SpatialRelation,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    datasets: HashMap<String, Vec<Feature>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dataset(mut self, source_id: impl Into<String>, features: Vec<Feature>) -> Self {
        self.insert(source_id, features);
        self
    }

    pub fn insert(&mut self, source_id: impl Into<String>, features: Vec<Feature>) {
        self.datasets.insert(source_id.into(), features);
    }

    fn search_dataset(
        &self,
        source: &Source,
        features: &[Feature],
        request: &FetchRequest,
    ) -> Vec<Feature> {
        let filter_boxes = request.spatial_filter.as_ref().map(filter_boxes);
        let limit = match request.options.max_results_per_dataset {
            0 => usize::MAX,
            n => n,
        };

        features
            .iter()
            .filter(|f| matches_phrase(source, f, &request.phrase, &request.options))
            .filter(|f| {
                filter_boxes.as_ref().is_none_or(|boxes| {
                    matches_spatial(f, boxes, request.options.active_spatial_filter)
                })
            })
            .take(limit)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FeatureFetcher for MemoryFetcher {
    #[instrument(name = "Memory fetch", level = "debug", skip_all, fields(phrase = %request.phrase, sources = sources.len()))]
    async fn fetch_features(
        &self,
        sources: &[Source],
        request: &FetchRequest,
    ) -> anyhow::Result<FetchResponse> {
        let mut response = FetchResponse::default();
        for source in sources {
            let Some(features) = self.datasets.get(&source.id) else {
                response.errors.push(FetchFailure::for_source(
                    source,
                    "no dataset registered for source",
                ));
                continue;
            };
            let matched = self.search_dataset(source, features, request);
            debug!(source = %source.id, matched = matched.len(), "Dataset searched");
            response.feature_collections.push(FeatureCollectionResult::new(
                source.clone(),
                Origin::Wfs,
                matched,
            ));
        }
        Ok(response)
    }
}

fn matches_phrase(source: &Source, feature: &Feature, phrase: &str, options: &SearchOptions) -> bool {
    let phrase = phrase.trim();
    if phrase.is_empty() {
        return true;
    }
    let values: Vec<String> = source
        .search_fields
        .iter()
        .filter_map(|field| feature.property_text(field))
        .collect();

    let value_matches = |needle: &str| values.iter().any(|v| wildcard_match(v, needle, options));

    if value_matches(phrase) {
        return true;
    }
    // Every word must hit some field, in any order.
    options.get_possible_combinations
        && phrase.split_whitespace().count() > 1
        && phrase.split_whitespace().all(value_matches)
}

fn wildcard_match(value: &str, needle: &str, options: &SearchOptions) -> bool {
    let (value, needle) = if options.match_case {
        (value.to_string(), needle.to_string())
    } else {
        (value.to_lowercase(), needle.to_lowercase())
    };
    match (options.wildcard_at_start, options.wildcard_at_end) {
        (true, true) => value.contains(&needle),
        (false, true) => value.starts_with(&needle),
        (true, false) => value.ends_with(&needle),
        (false, false) => value == needle,
    }
}

fn filter_boxes(filter: &SpatialFilter) -> Vec<BoundingBox> {
    filter.geometries.iter().filter_map(|g| g.bbox()).collect()
}

fn matches_spatial(feature: &Feature, boxes: &[BoundingBox], relation: SpatialRelation) -> bool {
    let Some(bbox) = feature.geometry.as_ref().and_then(|g| g.bbox()) else {
        return false;
    };
    boxes.iter().any(|filter| match relation {
        SpatialRelation::Intersects => filter.intersects(&bbox),
        SpatialRelation::Within => filter.contains(&bbox),
    })
}

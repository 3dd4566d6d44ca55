//! The fetch shared by autocomplete and full search.
//!
//! One batched call to the [`FeatureFetcher`] plus one call per plugin adapter, all
//! awaited together. Contributors that fail are recorded as [`FetchFailure`]s and
//! never take the others down with them.

use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture, future::join_all};
use geofed_sources::{
    Feature, FeatureFetcher, FetchFailure, FetchRequest, FetchResponse, SearchOptions, Source,
    SourceRegistry, VisibleLayers,
};
use tracing::{debug, instrument, warn};

use crate::{plugin::SearchAdapter, rank};

/// A phrase ready to be sent out, with exact-match handling applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub phrase: String,
    pub options: SearchOptions,
    pub exact: bool,
}

/// A phrase wrapped in double quotes asks for an exact match: the quotes are
/// stripped and wildcards and possible combinations are switched off.
pub fn prepare_query(phrase: &str, options: &SearchOptions) -> PreparedQuery {
    let trimmed = phrase.trim();
    let quoted = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'));

    match quoted {
        Some(inner) => PreparedQuery {
            phrase: inner.to_string(),
            options: options.clone().exact(),
            exact: true,
        },
        None => PreparedQuery {
            phrase: trimmed.to_string(),
            options: options.clone(),
            exact: false,
        },
    }
}

/// Sources a fetch goes to: the explicit selection, else the visible layers when
/// the options ask for them, else every configured source.
pub fn resolve_sources(
    selected: &[Source],
    options: &SearchOptions,
    registry: &SourceRegistry,
    visible_layers: &dyn VisibleLayers,
) -> Vec<Source> {
    if !selected.is_empty() {
        selected.to_vec()
    } else if options.search_in_visible_layers {
        visible_layers.visible_search_layers()
    } else {
        registry.get_all().to_vec()
    }
}

/// Features of `response` that can be drawn on the map.
pub fn highlight_features(response: &FetchResponse) -> Vec<Feature> {
    response
        .feature_collections
        .iter()
        .flat_map(|collection| collection.features.iter())
        .filter(|feature| feature.has_geometry())
        .cloned()
        .collect()
}

enum Contributor<'a> {
    Batch(&'a [Source]),
    Adapter(&'a str),
}

impl Contributor<'_> {
    fn failures(&self, error: &anyhow::Error) -> Vec<FetchFailure> {
        let message = error.to_string();
        match self {
            Self::Batch(sources) => sources
                .iter()
                .map(|source| FetchFailure::for_source(source, message.clone()))
                .collect(),
            Self::Adapter(name) => vec![FetchFailure::new(*name, *name, message)],
        }
    }
}

#[derive(Clone)]
pub struct FederatedFetch {
    fetcher: Arc<dyn FeatureFetcher>,
    adapters: Arc<[SearchAdapter]>,
}

impl FederatedFetch {
    pub fn new(fetcher: Arc<dyn FeatureFetcher>, adapters: Vec<SearchAdapter>) -> Self {
        Self {
            fetcher,
            adapters: adapters.into(),
        }
    }

    /// Query every contributor and merge the outcome in dispatch order.
    ///
    /// Empty collections are dropped and every remaining feature is decorated with
    /// its labels. The batch call is skipped when `sources` is empty.
    #[instrument(
        name = "Federated fetch",
        level = "debug",
        skip_all,
        fields(phrase = %request.phrase, sources = sources.len(), adapters = self.adapters.len(), autocomplete = request.autocomplete)
    )]
    pub async fn execute(&self, sources: &[Source], request: &FetchRequest) -> FetchResponse {
        let mut calls: Vec<(Contributor<'_>, BoxFuture<'_, anyhow::Result<FetchResponse>>)> =
            Vec::with_capacity(self.adapters.len() + 1);
        if !sources.is_empty() {
            calls.push((
                Contributor::Batch(sources),
                self.fetcher.fetch_features(sources, request),
            ));
        }
        for adapter in self.adapters.iter() {
            calls.push((
                Contributor::Adapter(adapter.name()),
                adapter.get_results(&request.phrase, request).boxed(),
            ));
        }

        let (contributors, futures): (Vec<_>, Vec<_>) = calls.into_iter().unzip();
        let settled = join_all(futures).await;

        let mut merged = FetchResponse::default();
        for (contributor, outcome) in contributors.iter().zip(settled) {
            match outcome {
                Ok(response) => merged.extend(response),
                Err(e) => {
                    let failures = contributor.failures(&e);
                    warn!(
                        error = %e,
                        failed = ?failures.iter().map(|f| f.caption.as_str()).collect::<Vec<_>>(),
                        "Search contributor failed"
                    );
                    merged.errors.extend(failures);
                }
            }
        }

        merged.feature_collections.retain(|collection| !collection.is_empty());
        rank::decorate_collections(&mut merged.feature_collections);
        debug!(
            collections = merged.feature_collections.len(),
            errors = merged.errors.len(),
            "Federated fetch settled"
        );
        merged
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use geofed_sources::{Origin, test_data};

    use super::*;
    use crate::plugin::{
        PluginFunctionality, PluginResults, SearchAdapter, tests::StaticProvider,
    };

    struct RejectingFetcher;

    #[async_trait]
    impl FeatureFetcher for RejectingFetcher {
        async fn fetch_features(
            &self,
            _sources: &[Source],
            _request: &FetchRequest,
        ) -> anyhow::Result<FetchResponse> {
            anyhow::bail!("service unavailable")
        }
    }

    /// Answers after `delay`, or fails when `fail` is set.
    struct SlowProvider {
        inner: StaticProvider,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl PluginResults for SlowProvider {
        async fn get_results(
            &self,
            phrase: &str,
            request: &FetchRequest,
        ) -> anyhow::Result<FetchResponse> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                anyhow::bail!("plugin backend down");
            }
            self.inner.get_results(phrase, request).await
        }
    }

    impl PluginFunctionality for SlowProvider {
        fn get_functionality(&self) -> Option<crate::spatial::SpatialToolDescriptor> {
            None
        }
    }

    fn adapter(name: &str, delay_ms: u64, fail: bool) -> SearchAdapter {
        let provider = Arc::new(SlowProvider {
            inner: StaticProvider { name: name.into() },
            delay: Duration::from_millis(delay_ms),
            fail,
        });
        SearchAdapter::new(name, provider.clone(), provider)
    }

    #[test]
    fn test_quoted_phrase_is_exact() {
        let options = SearchOptions {
            wildcard_at_start: true,
            wildcard_at_end: true,
            get_possible_combinations: true,
            ..SearchOptions::default()
        };
        let prepared = prepare_query("  \"Main Street\" ", &options);

        assert!(prepared.exact);
        assert_eq!(prepared.phrase, "Main Street");
        assert!(!prepared.options.wildcard_at_start);
        assert!(!prepared.options.wildcard_at_end);
        assert!(!prepared.options.get_possible_combinations);

        let plain = prepare_query("Main \"Street\"", &options);
        assert!(!plain.exact);
        assert_eq!(plain.options, options);
    }

    #[test]
    fn test_single_quote_is_not_exact() {
        let prepared = prepare_query("\"", &SearchOptions::default());
        assert!(!prepared.exact);
        assert_eq!(prepared.phrase, "\"");
    }

    #[test]
    fn test_source_resolution_precedence() {
        let registry = test_data::sample_registry();
        let visible = vec![test_data::parks_source()];
        let visible_only = SearchOptions {
            search_in_visible_layers: true,
            ..SearchOptions::default()
        };

        let selected = vec![test_data::schools_source()];
        let ids = |sources: Vec<Source>| sources.into_iter().map(|s| s.id).collect::<Vec<_>>();

        assert_eq!(
            ids(resolve_sources(&selected, &visible_only, &registry, &visible)),
            vec!["schools"]
        );
        assert_eq!(
            ids(resolve_sources(&[], &visible_only, &registry, &visible)),
            vec!["parks"]
        );
        assert_eq!(
            ids(resolve_sources(&[], &SearchOptions::default(), &registry, &visible)),
            vec!["addresses", "parks", "schools"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_follows_dispatch_order_not_completion_order() {
        let fetch = FederatedFetch::new(
            Arc::new(test_data::sample_fetcher()),
            vec![adapter("slow", 300, false), adapter("fast", 10, false)],
        );
        let sources = test_data::sample_sources();
        let response = fetch
            .execute(&sources, &FetchRequest::new("main", SearchOptions::default()))
            .await;

        let origins: Vec<String> = response
            .feature_collections
            .iter()
            .map(|c| c.origin.to_string())
            .collect();
        assert_eq!(origins, vec!["WFS", "WFS", "slow", "fast"]);
        assert!(response.errors.is_empty());
    }

    #[tokio::test]
    async fn test_empty_collections_pruned_and_features_decorated() {
        let fetch = FederatedFetch::new(Arc::new(test_data::sample_fetcher()), vec![]);
        let response = fetch
            .execute(
                &test_data::sample_sources(),
                &FetchRequest::new("central", SearchOptions::default()),
            )
            .await;

        assert_eq!(response.feature_collections.len(), 1);
        let parks = &response.feature_collections[0];
        assert_eq!(parks.source.id, "parks");
        let labels = parks.features[0].labels.as_ref().unwrap();
        assert_eq!(labels.feature_title, "Central Park");
        assert_eq!(labels.secondary_label_fields, "Manhattan");
    }

    #[tokio::test]
    async fn test_failures_are_recorded_per_contributor() {
        let fetch = FederatedFetch::new(
            Arc::new(RejectingFetcher),
            vec![adapter("gazetteer", 0, false), adapter("cadastre", 0, true)],
        );
        let sources = vec![test_data::parks_source(), test_data::schools_source()];
        let response = fetch
            .execute(&sources, &FetchRequest::new("mill", SearchOptions::default()))
            .await;

        assert_eq!(response.feature_collections.len(), 1);
        assert_eq!(
            response.feature_collections[0].origin,
            Origin::Plugin("gazetteer".into())
        );
        let captions: Vec<&str> = response.errors.iter().map(|e| e.caption.as_str()).collect();
        assert_eq!(captions, vec!["Parks", "Schools", "cadastre"]);
    }

    #[tokio::test]
    async fn test_batch_skipped_without_sources() {
        let fetch = FederatedFetch::new(Arc::new(RejectingFetcher), vec![]);
        let response = fetch
            .execute(&[], &FetchRequest::new("x", SearchOptions::default()))
            .await;
        assert_eq!(response, FetchResponse::default());
    }

    #[tokio::test]
    async fn test_highlight_features_need_geometry() {
        let fetch = FederatedFetch::new(Arc::new(test_data::sample_fetcher()), vec![]);
        let response = fetch
            .execute(
                &[test_data::schools_source()],
                &FetchRequest::new("ma", SearchOptions::default()),
            )
            .await;

        assert_eq!(response.feature_collections[0].len(), 2);
        let highlighted = highlight_features(&response);
        assert_eq!(highlighted.len(), 1);
        assert_eq!(highlighted[0].property_text("name").as_deref(), Some("Maple Elementary"));
    }
}

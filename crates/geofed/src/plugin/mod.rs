//! Plugin-provided search sources.
//!
//! Plugins are loaded by the host and handed to [`resolve_search_adapters`] once at
//! startup. Each candidate that declares the search capability resolves a
//! [`SearchMethods`] descriptor; only descriptors that expose both results and
//! functionality become usable [`SearchAdapter`]s. The resolved list is injected
//! into the coordinator and reused for every fetch.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::future::join_all;
use geofed_sources::{FetchRequest, FetchResponse};
use tracing::{info, instrument, warn};

use crate::spatial::SpatialToolDescriptor;

/// Contributes extra search results.
#[async_trait]
pub trait PluginResults: Send + Sync {
    async fn get_results(
        &self,
        phrase: &str,
        request: &FetchRequest,
    ) -> anyhow::Result<FetchResponse>;
}

/// Contributes an optional extra spatial search tool.
pub trait PluginFunctionality: Send + Sync {
    fn get_functionality(&self) -> Option<SpatialToolDescriptor>;
}

/// Late-resolved capability descriptor of a plugin.
#[derive(Default, Clone)]
pub struct SearchMethods {
    pub results: Option<Arc<dyn PluginResults>>,
    pub functionality: Option<Arc<dyn PluginFunctionality>>,
}

impl SearchMethods {
    /// Descriptor backed by one object implementing both capabilities.
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: PluginResults + PluginFunctionality + 'static,
    {
        Self {
            results: Some(provider.clone()),
            functionality: Some(provider),
        }
    }
}

/// A plugin as registered by the host.
#[async_trait]
pub trait PluginCandidate: Send + Sync {
    /// Type name used in diagnostics.
    fn type_name(&self) -> &str;

    /// Static capability flag: does this plugin take part in search at all?
    fn participates_in_search(&self) -> bool;

    async fn search_methods(&self) -> anyhow::Result<SearchMethods>;
}

/// A validated plugin search source.
#[derive(Clone)]
pub struct SearchAdapter {
    name: String,
    results: Arc<dyn PluginResults>,
    functionality: Arc<dyn PluginFunctionality>,
}

impl fmt::Debug for SearchAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchAdapter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SearchAdapter {
    pub fn new(
        name: impl Into<String>,
        results: Arc<dyn PluginResults>,
        functionality: Arc<dyn PluginFunctionality>,
    ) -> Self {
        Self {
            name: name.into(),
            results,
            functionality,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get_results(
        &self,
        phrase: &str,
        request: &FetchRequest,
    ) -> anyhow::Result<FetchResponse> {
        self.results.get_results(phrase, request).await
    }

    pub fn get_functionality(&self) -> Option<SpatialToolDescriptor> {
        self.functionality.get_functionality()
    }

    fn from_methods(name: &str, methods: SearchMethods) -> Result<Self, String> {
        match (methods.results, methods.functionality) {
            (Some(results), Some(functionality)) => Ok(Self::new(name, results, functionality)),
            (None, Some(_)) => Err("get_results".to_string()),
            (Some(_), None) => Err("get_functionality".to_string()),
            (None, None) => Err("get_results and get_functionality".to_string()),
        }
    }
}

/// Resolve the usable adapters among `candidates`, preserving registration order.
///
/// Candidates without the search capability are skipped. Resolution failures,
/// timeouts and incomplete descriptors are logged and excluded; none of them is fatal.
#[instrument(name = "Resolve search adapters", level = "info", skip_all, fields(candidates = candidates.len()))]
pub async fn resolve_search_adapters(
    candidates: &[Arc<dyn PluginCandidate>],
    timeout: Duration,
) -> Vec<SearchAdapter> {
    let participating: Vec<&Arc<dyn PluginCandidate>> = candidates
        .iter()
        .filter(|c| c.participates_in_search())
        .collect();

    let resolved = join_all(participating.iter().map(|candidate| async move {
        let name = candidate.type_name();
        match tokio::time::timeout(timeout, candidate.search_methods()).await {
            Ok(Ok(methods)) => SearchAdapter::from_methods(name, methods)
                .inspect_err(|missing| {
                    warn!(
                        plugin = name,
                        missing = %missing,
                        "Plugin search methods are incomplete, excluding it from search"
                    );
                })
                .ok(),
            Ok(Err(e)) => {
                warn!(plugin = name, error = %e, "Plugin failed to resolve its search methods");
                None
            }
            Err(_) => {
                warn!(plugin = name, ?timeout, "Plugin timed out resolving its search methods");
                None
            }
        }
    }))
    .await;

    let adapters: Vec<SearchAdapter> = resolved.into_iter().flatten().collect();
    info!(
        usable = adapters.len(),
        names = ?adapters.iter().map(SearchAdapter::name).collect::<Vec<_>>(),
        "Search adapters resolved"
    );
    adapters
}

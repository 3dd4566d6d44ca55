//! Geofed - Federated Geodata Search Coordinator
//!
//! Geofed coordinates a type-ahead and full-text search over many geodata sources
//! at once: configured WFS-like layers fetched through one batched
//! [`FeatureFetcher`](geofed_sources::FeatureFetcher), plus any number of plugin
//! [`SearchAdapter`]s. It debounces typing into autocomplete requests, merges
//! the partial results of every contributor, ranks and labels the features, keeps a
//! fairly-shared suggestion list, and manages the drawn spatial filter that can
//! constrain a search.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use geofed::{CoordinatorConfig, CoordinatorDeps, SearchCoordinator, SearchEvent};
//! use geofed::sources::test_data;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), geofed::GeofedError> {
//! let deps = CoordinatorDeps::new(test_data::sample_registry(), Arc::new(test_data::sample_fetcher()));
//! let coordinator = SearchCoordinator::spawn(deps, CoordinatorConfig::default())?;
//! let mut events = coordinator.subscribe();
//!
//! coordinator.submit_search("Main Street", None)?;
//! while let Ok(event) = events.recv().await {
//!     if let SearchEvent::ResultsUpdated { results, .. } = event {
//!         println!("{} features found", results.feature_count());
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Partial results**: a failing source or plugin never hides the others; failures are
//!   reported by caption
//! - **Stale response protection**: only the latest search and autocomplete request may
//!   update the session
//! - **Fair autocomplete**: at most seven suggestions, shared between the datasets that matched
//! - **Spatial filters**: polygon, circle, select and extent tools, plus plugin-contributed ones
//! - **Exact search**: wrap the phrase in double quotes to switch off wildcards
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod autocomplete;
mod config;
pub mod error;
mod plugin;
mod rank;
mod search;
mod spatial;

pub use autocomplete::{
    AutocompleteEntry, DEFAULT_MAX_SLOTS, build_autocomplete_list, decode_commas, encode_commas,
    natural_cmp, split_entry,
};
pub use config::{CoordinatorConfig, CoordinatorConfigBuilder};
pub use error::{GeofedError, Result};
pub use geofed_sources as sources;
pub use plugin::{
    PluginCandidate, PluginFunctionality, PluginResults, SearchAdapter, SearchMethods,
    resolve_search_adapters,
};
pub use rank::{
    FALLBACK_LABEL, WordMatchers, build_label, decorate_collections, decorate_feature,
    feature_labels, rank_search_fields, split_phrase_words,
};
pub use search::{
    CoordinatorDeps, FederatedFetch, HashParams, PreparedQuery, SearchCoordinator, SearchEvent,
    SearchResults, SearchSession, SessionEvent, highlight_features, prepare_query,
    resolve_sources,
};
pub use spatial::{
    DrawingSurface, SpatialError, SpatialFilterController, SpatialState, SpatialTool,
    SpatialToolDescriptor,
};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the geofed crates.
///
/// Installs a `tracing` fmt subscriber filtered at `level`; a `RUST_LOG`
/// environment variable takes precedence. Calling it again is a no-op.
///
/// ```rust
/// use geofed::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), geofed::GeofedError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static ()> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?;

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .map_err(|e| GeofedError::Other(anyhow::anyhow!(e)))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        assert!(init_logging(tracing::Level::WARN).is_ok());
        assert!(init_logging(tracing::Level::DEBUG).is_ok());
    }
}

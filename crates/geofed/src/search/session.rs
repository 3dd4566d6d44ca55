//! Search session state and its reducer.
//!
//! The session is never mutated in place: every event produces the next session
//! from the previous one, so a consumer holding a published snapshot never sees it
//! change underneath it.

use geofed_sources::{Feature, FeatureCollectionResult, FetchFailure, SearchOptions, Source};
use itertools::Itertools;
use serde::Serialize;

use crate::autocomplete::AutocompleteEntry;

/// Merged outcome of a full search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    pub feature_collections: Vec<FeatureCollectionResult>,
    pub errors: Vec<FetchFailure>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.feature_collections.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_collections.iter().map(FeatureCollectionResult::len).sum()
    }

    /// User-facing summary of the contributors that failed, if any.
    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let captions = self.errors.iter().map(|e| e.caption.as_str()).unique().join(", ");
        Some(format!("could not fetch from: {captions}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSession {
    pub search_string: String,
    /// Explicitly selected sources; empty means every known source
    pub search_sources: Vec<Source>,
    pub search_options: SearchOptions,
    pub autocomplete_list: Vec<AutocompleteEntry>,
    pub search_results: SearchResults,
    /// Features of the last full search that carry a geometry
    pub highlight_features: Vec<Feature>,
    pub loading: bool,
    /// Bumped by every full search and by `clear`; responses from older generations are stale
    pub generation: u64,
    pub last_executed_phrase: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhraseChanged(String),
    SourcesSelected(Vec<Source>),
    OptionsChanged(SearchOptions),
    AutocompleteCleared,
    AutocompleteReady(Vec<AutocompleteEntry>),
    SearchDispatched {
        phrase: String,
    },
    SearchCompleted {
        results: SearchResults,
        highlight_features: Vec<Feature>,
    },
    Cleared,
}

impl SearchSession {
    pub fn new(search_options: SearchOptions) -> Self {
        Self {
            search_options,
            ..Self::default()
        }
    }

    /// Produce the session that follows `self` after `event`.
    #[must_use]
    pub fn apply(self, event: SessionEvent) -> Self {
        match event {
            SessionEvent::PhraseChanged(search_string) => Self {
                search_string,
                ..self
            },
            SessionEvent::SourcesSelected(search_sources) => Self {
                search_sources,
                ..self
            },
            SessionEvent::OptionsChanged(search_options) => Self {
                search_options,
                ..self
            },
            SessionEvent::AutocompleteCleared => Self {
                autocomplete_list: Vec::new(),
                ..self
            },
            SessionEvent::AutocompleteReady(autocomplete_list) => Self {
                autocomplete_list,
                ..self
            },
            SessionEvent::SearchDispatched { phrase } => Self {
                search_string: phrase.clone(),
                last_executed_phrase: Some(phrase),
                autocomplete_list: Vec::new(),
                loading: true,
                generation: self.generation + 1,
                ..self
            },
            SessionEvent::SearchCompleted {
                results,
                highlight_features,
            } => Self {
                search_results: results,
                highlight_features,
                loading: false,
                ..self
            },
            SessionEvent::Cleared => Self {
                generation: self.generation + 1,
                ..Self::new(self.search_options)
            },
        }
    }
}

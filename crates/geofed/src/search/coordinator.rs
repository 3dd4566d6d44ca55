//! The search coordinator actor.
//!
//! A single tokio task owns the [`SearchSession`] and the spatial filter state.
//! [`SearchCoordinator`] handles send it commands; fetches, the debounce timer and
//! drawings run as separate tasks and report back over an internal channel. State
//! changes are published as [`SearchEvent`]s on a broadcast channel.

use std::sync::Arc;

use async_trait::async_trait;
use geofed_sources::{
    Feature, FeatureFetcher, FetchRequest, FetchResponse, SearchOptions, Source, SourceRegistry,
    SpatialFilter, VisibleLayers,
};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::AbortHandle,
};
use tracing::{debug, info, instrument, warn};

use super::{
    debounce::DebounceTimer,
    federated::{FederatedFetch, highlight_features, prepare_query, resolve_sources},
    hash::HashParams,
    session::{SearchResults, SearchSession, SessionEvent},
};
use crate::{
    GeofedError, Result,
    autocomplete::{AutocompleteEntry, build_autocomplete_list},
    config::CoordinatorConfig,
    plugin::{PluginCandidate, SearchAdapter, resolve_search_adapters},
    spatial::{DrawingSurface, SpatialFilterController, SpatialState, SpatialTool},
};

/// Published state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    PhraseChanged(String),
    AutocompleteUpdated(Vec<AutocompleteEntry>),
    ResultsUpdated {
        results: SearchResults,
        highlight_features: Vec<Feature>,
        /// "could not fetch from: ..." when some contributors failed
        error_message: Option<String>,
    },
    LoadingChanged(bool),
    SpatialStateChanged(SpatialState),
}

/// Used when the host has no map to draw on.
struct NoDrawingSurface;

#[async_trait]
impl DrawingSurface for NoDrawingSurface {
    async fn start_drawing(&self, tool: &SpatialTool) -> anyhow::Result<Vec<Feature>> {
        anyhow::bail!("no drawing surface available for the {} tool", tool.filter_kind())
    }
}

/// Everything the coordinator consumes from its host.
pub struct CoordinatorDeps {
    registry: SourceRegistry,
    fetcher: Arc<dyn FeatureFetcher>,
    visible_layers: Arc<dyn VisibleLayers>,
    drawing_surface: Arc<dyn DrawingSurface>,
    adapters: Vec<SearchAdapter>,
    options: SearchOptions,
}

impl CoordinatorDeps {
    pub fn new(registry: SourceRegistry, fetcher: Arc<dyn FeatureFetcher>) -> Self {
        Self {
            registry,
            fetcher,
            visible_layers: Arc::new(Vec::<Source>::new()),
            drawing_surface: Arc::new(NoDrawingSurface),
            adapters: Vec::new(),
            options: SearchOptions::default(),
        }
    }

    pub fn with_visible_layers(mut self, visible_layers: Arc<dyn VisibleLayers>) -> Self {
        self.visible_layers = visible_layers;
        self
    }

    pub fn with_drawing_surface(mut self, drawing_surface: Arc<dyn DrawingSurface>) -> Self {
        self.drawing_surface = drawing_surface;
        self
    }

    /// Add already-resolved adapters.
    pub fn with_adapters(mut self, adapters: Vec<SearchAdapter>) -> Self {
        self.adapters.extend(adapters);
        self
    }

    /// Resolve plugin candidates and add the usable ones as adapters.
    pub async fn with_plugins(
        self,
        candidates: &[Arc<dyn PluginCandidate>],
        config: &CoordinatorConfig,
    ) -> Self {
        let adapters = resolve_search_adapters(candidates, config.adapter_resolution_timeout).await;
        self.with_adapters(adapters)
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug)]
enum Command {
    SetPhrase(String),
    SubmitSearch {
        phrase: String,
        spatial_filter: Option<SpatialFilter>,
    },
    Clear,
    SelectSources(Vec<String>),
    SetOptions(SearchOptions),
    SelectSpatialTool(SpatialTool),
    AbortDrawing,
    ApplyHash(String),
    Snapshot(oneshot::Sender<SearchSession>),
}

enum Internal {
    DebounceElapsed {
        ticket: u64,
    },
    AutocompleteFetched {
        generation: u64,
        ticket: u64,
        phrase: String,
        response: FetchResponse,
    },
    SearchFetched {
        generation: u64,
        response: FetchResponse,
    },
    DrawingFinished {
        id: u64,
        outcome: anyhow::Result<Vec<Feature>>,
    },
}

/// Cloneable handle to a running coordinator. The coordinator stops once every
/// handle is dropped.
#[derive(Debug, Clone)]
pub struct SearchCoordinator {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<SearchEvent>,
    spatial_tools: Arc<[SpatialTool]>,
}

impl SearchCoordinator {
    /// Start the coordinator on the current tokio runtime.
    #[instrument(name = "Spawn search coordinator", level = "info", skip_all, fields(sources = deps.registry.len(), adapters = deps.adapters.len()))]
    pub fn spawn(deps: CoordinatorDeps, config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(anyhow::Error::from)?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity);

        let spatial_tools: Arc<[SpatialTool]> = [
            SpatialTool::Polygon,
            SpatialTool::Circle,
            SpatialTool::Select,
            SpatialTool::Extent,
        ]
        .into_iter()
        .chain(
            deps.adapters
                .iter()
                .filter_map(SearchAdapter::get_functionality)
                .map(SpatialTool::Plugin),
        )
        .collect();

        let actor = CoordinatorLoop {
            session: SearchSession::new(deps.options),
            spatial: SpatialFilterController::new(),
            registry: deps.registry,
            fetch: FederatedFetch::new(deps.fetcher, deps.adapters),
            visible_layers: deps.visible_layers,
            drawing_surface: deps.drawing_surface,
            config,
            debounce: DebounceTimer::default(),
            autocomplete_ticket: 0,
            drawing: None,
            drawing_ids: 0,
            events: events.clone(),
            internal: internal_tx,
        };
        runtime.spawn(actor.run(command_rx, internal_rx));

        Ok(Self {
            commands: command_tx,
            events,
            spatial_tools,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SearchEvent> {
        self.events.subscribe()
    }

    /// Built-in spatial tools followed by those contributed by adapters.
    pub fn spatial_tools(&self) -> &[SpatialTool] {
        &self.spatial_tools
    }

    /// The user typed: update the phrase and (re)start the autocomplete debounce.
    pub fn set_phrase(&self, phrase: impl Into<String>) -> Result<()> {
        self.send(Command::SetPhrase(phrase.into()))
    }

    /// Run a full search now. `None` clears any active spatial filter.
    pub fn submit_search(
        &self,
        phrase: impl Into<String>,
        spatial_filter: Option<SpatialFilter>,
    ) -> Result<()> {
        self.send(Command::SubmitSearch {
            phrase: phrase.into(),
            spatial_filter,
        })
    }

    pub fn clear(&self) -> Result<()> {
        self.send(Command::Clear)
    }

    /// Restrict searches to the given source ids; unknown ids are ignored and an
    /// empty list means every source.
    pub fn select_sources<S: Into<String>>(&self, ids: impl IntoIterator<Item = S>) -> Result<()> {
        self.send(Command::SelectSources(ids.into_iter().map(Into::into).collect()))
    }

    pub fn set_options(&self, options: SearchOptions) -> Result<()> {
        self.send(Command::SetOptions(options))
    }

    pub fn select_spatial_tool(&self, tool: SpatialTool) -> Result<()> {
        self.send(Command::SelectSpatialTool(tool))
    }

    pub fn abort_drawing(&self) -> Result<()> {
        self.send(Command::AbortDrawing)
    }

    /// Apply `#q=...&s=...` from the URL.
    pub fn apply_hash(&self, fragment: impl Into<String>) -> Result<()> {
        self.send(Command::ApplyHash(fragment.into()))
    }

    /// Current session, after every previously sent command has been handled.
    pub async fn snapshot(&self) -> Result<SearchSession> {
        let (reply, session) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        session.await.map_err(|_| GeofedError::CoordinatorClosed)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| GeofedError::CoordinatorClosed)
    }
}

struct DrawingTask {
    id: u64,
    handle: AbortHandle,
}

struct CoordinatorLoop {
    session: SearchSession,
    spatial: SpatialFilterController,
    registry: SourceRegistry,
    fetch: FederatedFetch,
    visible_layers: Arc<dyn VisibleLayers>,
    drawing_surface: Arc<dyn DrawingSurface>,
    config: CoordinatorConfig,
    debounce: DebounceTimer,
    /// Only the autocomplete fetch carrying the latest ticket may update the list
    autocomplete_ticket: u64,
    drawing: Option<DrawingTask>,
    drawing_ids: u64,
    events: broadcast::Sender<SearchEvent>,
    internal: mpsc::UnboundedSender<Internal>,
}

impl CoordinatorLoop {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        info!("Search coordinator started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(message) = internal.recv() => self.handle_internal(message),
            }
        }
        self.debounce.cancel();
        self.abort_drawing_task();
        info!("Search coordinator stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetPhrase(phrase) => self.set_phrase(phrase),
            Command::SubmitSearch {
                phrase,
                spatial_filter,
            } => self.submit_search(phrase, spatial_filter),
            Command::Clear => self.clear(),
            Command::SelectSources(ids) => {
                let sources = self.registry.get_by_ids(&ids);
                debug!(requested = ids.len(), selected = sources.len(), "Sources selected");
                self.transition(SessionEvent::SourcesSelected(sources));
            }
            Command::SetOptions(options) => self.transition(SessionEvent::OptionsChanged(options)),
            Command::SelectSpatialTool(tool) => self.select_spatial_tool(tool),
            Command::AbortDrawing => self.abort_drawing(),
            Command::ApplyHash(fragment) => self.apply_hash(&fragment),
            Command::Snapshot(reply) => {
                if reply.send(self.session.clone()).is_err() {
                    debug!("Snapshot requester went away");
                }
            }
        }
    }

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::DebounceElapsed { ticket } => {
                if self.debounce.take_fired(ticket) {
                    self.dispatch_autocomplete();
                }
            }
            Internal::AutocompleteFetched {
                generation,
                ticket,
                phrase,
                response,
            } => self.autocomplete_fetched(generation, ticket, &phrase, response),
            Internal::SearchFetched {
                generation,
                response,
            } => self.search_fetched(generation, response),
            Internal::DrawingFinished { id, outcome } => self.drawing_finished(id, outcome),
        }
    }

    fn transition(&mut self, event: SessionEvent) {
        let session = std::mem::take(&mut self.session);
        self.session = session.apply(event);
    }

    fn emit(&self, event: SearchEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_spatial_state(&self) {
        self.emit(SearchEvent::SpatialStateChanged(self.spatial.state().clone()));
    }

    fn meets_autocomplete_minimum(&self) -> bool {
        self.session.search_string.trim().chars().count() >= self.config.min_autocomplete_chars
    }

    fn clear_autocomplete(&mut self) {
        if !self.session.autocomplete_list.is_empty() {
            self.transition(SessionEvent::AutocompleteCleared);
            self.emit(SearchEvent::AutocompleteUpdated(Vec::new()));
        }
    }

    fn prepare_fetch(&self, phrase: &str, autocomplete: bool) -> (Vec<Source>, FetchRequest) {
        let query = prepare_query(phrase, &self.session.search_options);
        if query.exact {
            debug!(phrase = %query.phrase, "Exact match requested");
        }
        let sources = resolve_sources(
            &self.session.search_sources,
            &query.options,
            &self.registry,
            self.visible_layers.as_ref(),
        );
        let request = FetchRequest::new(query.phrase, query.options)
            .with_spatial_filter(self.spatial.current_filter().cloned())
            .for_autocomplete(autocomplete);
        (sources, request)
    }

    fn set_phrase(&mut self, phrase: String) {
        self.transition(SessionEvent::PhraseChanged(phrase.clone()));
        self.emit(SearchEvent::PhraseChanged(phrase));

        if self.meets_autocomplete_minimum() {
            let internal = self.internal.clone();
            self.debounce.schedule(self.config.debounce, move |ticket| {
                let _ = internal.send(Internal::DebounceElapsed { ticket });
            });
        } else {
            self.debounce.cancel();
            self.autocomplete_ticket += 1;
            self.clear_autocomplete();
        }
    }

    fn dispatch_autocomplete(&mut self) {
        if !self.meets_autocomplete_minimum() {
            return;
        }
        self.autocomplete_ticket += 1;
        let ticket = self.autocomplete_ticket;
        let generation = self.session.generation;
        let (sources, request) = self.prepare_fetch(&self.session.search_string, true);
        debug!(phrase = %request.phrase, ticket, "Dispatching autocomplete fetch");

        let fetch = self.fetch.clone();
        let internal = self.internal.clone();
        tokio::spawn(async move {
            let response = fetch.execute(&sources, &request).await;
            let _ = internal.send(Internal::AutocompleteFetched {
                generation,
                ticket,
                phrase: request.phrase,
                response,
            });
        });
    }

    fn autocomplete_fetched(
        &mut self,
        generation: u64,
        ticket: u64,
        phrase: &str,
        mut response: FetchResponse,
    ) {
        if generation != self.session.generation || ticket != self.autocomplete_ticket {
            debug!(generation, ticket, "Discarding stale autocomplete response");
            return;
        }
        if !response.errors.is_empty() {
            debug!(failed = response.errors.len(), "Autocomplete fetch had failures");
        }
        let list = build_autocomplete_list(
            &mut response.feature_collections,
            phrase,
            self.config.max_autocomplete_slots,
        );
        debug!(entries = list.len(), "Autocomplete list ready");
        self.transition(SessionEvent::AutocompleteReady(list.clone()));
        self.emit(SearchEvent::AutocompleteUpdated(list));
    }

    fn submit_search(&mut self, phrase: String, spatial_filter: Option<SpatialFilter>) {
        self.debounce.cancel();
        let stripped = prepare_query(&phrase, &self.session.search_options).phrase;
        if stripped.trim().is_empty() && spatial_filter.is_none() {
            debug!("Ignoring search without phrase or spatial filter");
            return;
        }

        if let Some(filter) = spatial_filter {
            self.abort_drawing_task();
            self.spatial.activate(filter);
            self.emit_spatial_state();
        } else if self.spatial.current_filter().is_some() {
            self.spatial.clear();
            self.emit_spatial_state();
        }
        self.start_search(phrase);
    }

    fn start_search(&mut self, phrase: String) {
        self.debounce.cancel();
        self.autocomplete_ticket += 1;
        let had_autocomplete = !self.session.autocomplete_list.is_empty();
        let was_loading = self.session.loading;
        let phrase_changed = phrase != self.session.search_string;
        self.transition(SessionEvent::SearchDispatched {
            phrase: phrase.clone(),
        });
        if phrase_changed {
            self.emit(SearchEvent::PhraseChanged(phrase));
        }
        if had_autocomplete {
            self.emit(SearchEvent::AutocompleteUpdated(Vec::new()));
        }
        if !was_loading {
            self.emit(SearchEvent::LoadingChanged(true));
        }

        let generation = self.session.generation;
        let (sources, request) = self.prepare_fetch(&self.session.search_string, false);
        info!(
            phrase = %request.phrase,
            generation,
            sources = sources.len(),
            spatial = request.spatial_filter.is_some(),
            "Dispatching search"
        );

        let fetch = self.fetch.clone();
        let internal = self.internal.clone();
        tokio::spawn(async move {
            let response = fetch.execute(&sources, &request).await;
            let _ = internal.send(Internal::SearchFetched {
                generation,
                response,
            });
        });
    }

    fn search_fetched(&mut self, generation: u64, response: FetchResponse) {
        if generation != self.session.generation {
            debug!(
                generation,
                current = self.session.generation,
                "Discarding stale search response"
            );
            return;
        }
        let highlight = highlight_features(&response);
        let results = SearchResults {
            feature_collections: response.feature_collections,
            errors: response.errors,
        };
        let error_message = results.error_message();
        if let Some(message) = &error_message {
            warn!(%message, "Search completed with failures");
        }
        info!(
            generation,
            collections = results.feature_collections.len(),
            features = results.feature_count(),
            "Search completed"
        );

        self.transition(SessionEvent::SearchCompleted {
            results: results.clone(),
            highlight_features: highlight.clone(),
        });
        self.emit(SearchEvent::ResultsUpdated {
            results,
            highlight_features: highlight,
            error_message,
        });
        self.emit(SearchEvent::LoadingChanged(false));
    }

    fn clear(&mut self) {
        self.debounce.cancel();
        self.abort_drawing_task();
        self.autocomplete_ticket += 1;
        if self.spatial.clear() {
            self.emit_spatial_state();
        }

        let was_loading = self.session.loading;
        self.transition(SessionEvent::Cleared);
        info!(generation = self.session.generation, "Search cleared");

        self.emit(SearchEvent::PhraseChanged(String::new()));
        self.emit(SearchEvent::AutocompleteUpdated(Vec::new()));
        self.emit(SearchEvent::ResultsUpdated {
            results: SearchResults::default(),
            highlight_features: Vec::new(),
            error_message: None,
        });
        if was_loading {
            self.emit(SearchEvent::LoadingChanged(false));
        }
    }

    fn select_spatial_tool(&mut self, tool: SpatialTool) {
        self.abort_drawing_task();
        if let Some(previous) = self.spatial.start_drawing(tool.clone()) {
            debug!(kind = %previous.kind, "Previous spatial filter cleared");
        }
        self.emit_spatial_state();

        self.drawing_ids += 1;
        let id = self.drawing_ids;
        let surface = Arc::clone(&self.drawing_surface);
        let internal = self.internal.clone();
        let task = tokio::spawn(async move {
            let outcome = surface.start_drawing(&tool).await;
            let _ = internal.send(Internal::DrawingFinished { id, outcome });
        });
        self.drawing = Some(DrawingTask {
            id,
            handle: task.abort_handle(),
        });
    }

    fn abort_drawing_task(&mut self) {
        if let Some(task) = self.drawing.take() {
            task.handle.abort();
        }
    }

    fn abort_drawing(&mut self) {
        self.abort_drawing_task();
        if self.spatial.abort() {
            debug!("Drawing aborted");
            self.emit_spatial_state();
        }
    }

    fn drawing_finished(&mut self, id: u64, outcome: anyhow::Result<Vec<Feature>>) {
        if self.drawing.as_ref().is_none_or(|task| task.id != id) {
            debug!(id, "Discarding result of a cancelled drawing");
            return;
        }
        self.drawing = None;

        let completed = outcome
            .map_err(GeofedError::from)
            .and_then(|features| self.spatial.complete(features).map_err(GeofedError::from));
        match completed {
            Ok(filter) => {
                info!(
                    kind = %filter.kind,
                    geometries = filter.geometries.len(),
                    extent = ?filter.bbox(),
                    "Spatial filter drawn"
                );
                self.emit_spatial_state();
                let phrase = self.session.search_string.clone();
                self.start_search(phrase);
            }
            Err(e) => {
                warn!(error = %e, "Drawing produced no spatial filter");
                self.spatial.abort();
                self.emit_spatial_state();
            }
        }
    }

    fn apply_hash(&mut self, fragment: &str) {
        let params = HashParams::parse(fragment);
        let Some(query) = params.query else {
            debug!("URL hash carries no query");
            return;
        };
        if self.session.last_executed_phrase.as_deref() == Some(query.as_str()) {
            debug!(%query, "URL hash query already executed");
            return;
        }
        let sources = self.registry.get_by_ids(&params.source_ids);
        debug!(%query, sources = sources.len(), "Applying URL hash");
        self.transition(SessionEvent::SourcesSelected(sources));
        self.submit_search(query, None);
    }
}

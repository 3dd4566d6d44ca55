//! Federated search: session state, the shared fetch pipeline and the coordinator
//! actor that drives them.

mod coordinator;
mod debounce;
mod federated;
mod hash;
mod session;

pub use coordinator::{CoordinatorDeps, SearchCoordinator, SearchEvent};
pub use federated::{
    FederatedFetch, PreparedQuery, highlight_features, prepare_query, resolve_sources,
};
pub use hash::HashParams;
pub use session::{SearchResults, SearchSession, SessionEvent};

//! State shared across request handlers.

use std::sync::Arc;

use andor_core::UserDirectory;
use andor_engine::Orchestrator;
use andor_storage::DocumentStore;

/// Server-wide state, seen by the routes outside any collection.
pub(crate) struct AppState {
    /// Every mounted collection, in config order.
    pub(crate) collections: Vec<String>,
}

/// State behind one collection's routes. All collections hold the same
/// user directory, and their orchestrators share one mutation token.
pub(crate) struct CollectionState {
    /// Name of the collection mounted at `/{name}`.
    pub(crate) name: String,
    pub(crate) orchestrator: Orchestrator<dyn DocumentStore>,
    pub(crate) users: Arc<UserDirectory>,
}

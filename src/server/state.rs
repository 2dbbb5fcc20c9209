//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::llm::SummaryGenerator;
use crate::sessions::SessionStore;

/// Shared application state.
pub struct AppState {
    /// Session summary storage.
    pub store: Arc<dyn SessionStore>,
    /// Summary generator for raw notes.
    pub generator: Arc<dyn SummaryGenerator>,
}

impl AppState {
    /// Create a new application state from already opened dependencies.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, generator: Arc<dyn SummaryGenerator>) -> Arc<Self> {
        Arc::new(Self { store, generator })
    }
}

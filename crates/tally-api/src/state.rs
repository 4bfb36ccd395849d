//! Shared application state.

use std::sync::Arc;

use tally_account::application::registry::AccountRegistry;
use tally_core::repository::EventRepository;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Routes commands to account workers.
    pub registry: Arc<AccountRegistry>,
    /// The journal, read directly by queries.
    pub event_repository: Arc<dyn EventRepository>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(registry: Arc<AccountRegistry>, event_repository: Arc<dyn EventRepository>) -> Self {
        Self {
            registry,
            event_repository,
        }
    }
}

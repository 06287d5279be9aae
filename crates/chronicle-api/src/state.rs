//! Shared application state.

use std::sync::Arc;

use chronicle_session::application::lifecycle::SessionLifecycle;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The session lifecycle manager all routes go through.
    pub lifecycle: Arc<SessionLifecycle>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(lifecycle: Arc<SessionLifecycle>) -> Self {
        Self { lifecycle }
    }
}

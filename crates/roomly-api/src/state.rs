//! Shared application state.

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderName;
use roomly_core::clock::Clock;
use roomly_core::identity::UserDirectory;
use roomly_core::repository::EventRepository;
use roomly_identity::application::directory::EventSourcedUserDirectory;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for event timestamps.
    pub clock: Arc<dyn Clock>,
    /// Event store backing every bounded context.
    pub event_repository: Arc<dyn EventRepository>,
    /// Resolves callers and requester identities.
    pub users: Arc<dyn UserDirectory>,
    /// Header carrying the authenticated user id.
    pub identity_header: HeaderName,
}

impl AppState {
    /// Create new application state. Users are resolved from the same event
    /// store.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        event_repository: Arc<dyn EventRepository>,
        identity_header: HeaderName,
    ) -> Self {
        let users = Arc::new(EventSourcedUserDirectory::new(Arc::clone(&event_repository)));
        Self {
            clock,
            event_repository,
            users,
            identity_header,
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("identity_header", &self.identity_header)
            .finish_non_exhaustive()
    }
}

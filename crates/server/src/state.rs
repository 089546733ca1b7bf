//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::{IdentityStore, TicketStore};
use crate::middleware::{PolicyTable, SessionError, SessionIssuer};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Stores are trait objects so the same router
/// runs against `PostgreSQL` in production and the in-memory store in tests.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    identity: Arc<dyn IdentityStore>,
    tickets: Arc<dyn TicketStore>,
    sessions: SessionIssuer,
    policies: PolicyTable,
}

impl AppState {
    /// Create a new application state with the standard policy table.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::KeyTooShort` if the session secret cannot key the cookie cipher.
    pub fn new(
        config: ServerConfig,
        identity: Arc<dyn IdentityStore>,
        tickets: Arc<dyn TicketStore>,
    ) -> Result<Self, SessionError> {
        let sessions = SessionIssuer::from_config(&config)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                tickets,
                sessions,
                policies: PolicyTable::standard(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Users, roles and their assignments.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityStore {
        self.inner.identity.as_ref()
    }

    #[must_use]
    pub fn tickets(&self) -> &dyn TicketStore {
        self.inner.tickets.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionIssuer {
        &self.inner.sessions
    }

    #[must_use]
    pub fn policies(&self) -> &PolicyTable {
        &self.inner.policies
    }
}

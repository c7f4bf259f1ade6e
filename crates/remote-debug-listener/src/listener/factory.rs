use std::sync::Arc;

use tracing::info;

use super::DebugListener;
use crate::config::ListenerConfig;
use crate::counters::SessionCounters;
use crate::domain::{ConnectionId, ListenMode, SessionIdentity};
use crate::error::DebugError;
use crate::identity::IdentityProvider;
use crate::ports::{ClientProvider, UiSurface};

/// Builds listeners for connections that already have a remote client.
///
/// Session numbers come from the owned `SessionCounters`, so every factory
/// numbers its listeners independently.
pub struct ListenerFactory {
    clients: Arc<dyn ClientProvider>,
    identity: IdentityProvider,
    counters: SessionCounters,
    config: ListenerConfig,
}

impl ListenerFactory {
    pub fn new(
        clients: Arc<dyn ClientProvider>,
        identity: IdentityProvider,
        config: ListenerConfig,
    ) -> Self {
        Self::with_counters(clients, identity, SessionCounters::new(), config)
    }

    pub fn with_counters(
        clients: Arc<dyn ClientProvider>,
        identity: IdentityProvider,
        counters: SessionCounters,
        config: ListenerConfig,
    ) -> Self {
        Self {
            clients,
            identity,
            counters,
            config,
        }
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    /// Creates a listener for `connection_id`.
    ///
    /// Without an explicit `username` the client's login name is used,
    /// uppercased. Fails with `NoClient` when the connection has no client
    /// and with `RegistryUnreadable` or `Persistence` when the identifiers
    /// cannot be resolved; no session number is consumed on failure.
    #[tracing::instrument(skip(self, ui), fields(connection = %connection_id))]
    pub fn create(
        &self,
        connection_id: &ConnectionId,
        ui: Arc<dyn UiSurface>,
        username: Option<&str>,
        terminal_mode: bool,
    ) -> Result<Arc<DebugListener>, DebugError> {
        let client = self
            .clients
            .client(connection_id)
            .ok_or_else(|| DebugError::NoClient(connection_id.to_string()))?;

        let terminal_id = self.identity.get_or_create_terminal_id()?;
        let workspace_id = self.identity.get_or_create_workspace_id()?;
        let session_number = self.counters.next(connection_id);

        let username = match username {
            Some(name) => name.to_string(),
            None => client.username().to_uppercase(),
        };
        let mode = ListenMode::from_terminal_flag(terminal_mode);
        let identity = SessionIdentity::new(workspace_id, terminal_id, username, mode);

        info!(
            session = session_number,
            mode = %mode,
            username = %identity.username,
            "Created debug listener"
        );

        Ok(DebugListener::new(
            connection_id.clone(),
            session_number,
            identity,
            client,
            ui,
            self.config.event_capacity,
        ))
    }
}

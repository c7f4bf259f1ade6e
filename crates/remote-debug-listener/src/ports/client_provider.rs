use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use remote_debug_common::mutex_lock_or_recover;

use crate::domain::ConnectionId;
use crate::ports::RemoteClient;

/// Resolves the remote client of an established connection.
pub trait ClientProvider: Send + Sync {
    fn client(&self, connection_id: &ConnectionId) -> Option<Arc<dyn RemoteClient>>;
}

/// In-process table of connected clients.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ConnectionId, Arc<dyn RemoteClient>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `client`, returning the one it replaced.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        client: Arc<dyn RemoteClient>,
    ) -> Option<Arc<dyn RemoteClient>> {
        mutex_lock_or_recover(&self.clients).insert(connection_id, client)
    }

    pub fn remove(&self, connection_id: &ConnectionId) -> Option<Arc<dyn RemoteClient>> {
        mutex_lock_or_recover(&self.clients).remove(connection_id)
    }

    pub fn connection_count(&self) -> usize {
        mutex_lock_or_recover(&self.clients).len()
    }
}

impl ClientProvider for ClientRegistry {
    fn client(&self, connection_id: &ConnectionId) -> Option<Arc<dyn RemoteClient>> {
        mutex_lock_or_recover(&self.clients)
            .get(connection_id)
            .cloned()
    }
}

//! Decides who owns the remote listener for an identity tuple.
//!
//! The backend answers a listener probe with the same conflict error
//! whether the holder is a stale listener of our own or a different
//! session. Probing twice tells them apart: a stale listener of ours keeps
//! conflicting, while a foreign owner's conflict does not repeat on an
//! immediate retry.

use std::sync::Arc;

use tracing::{debug, info};

use crate::classifier::is_conflict;
use crate::domain::{ConflictResult, SessionIdentity};
use crate::error::RemoteError;
use crate::ports::RemoteClient;

/// Probes and tears down the listener registered for one identity.
pub struct SessionArbiter {
    client: Arc<dyn RemoteClient>,
    identity: SessionIdentity,
}

impl SessionArbiter {
    pub fn new(client: Arc<dyn RemoteClient>, identity: SessionIdentity) -> Self {
        Self { client, identity }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Finds out whether someone already holds the listener.
    ///
    /// A first failure that is not a conflict is returned unchanged.
    pub async fn probe(&self) -> Result<ConflictResult, RemoteError> {
        let first = match self.client.list_listeners(&self.identity).await {
            Ok(_) => {
                debug!(mode = %self.identity.mode, "No listener conflict");
                return Ok(ConflictResult::None);
            }
            Err(err) if is_conflict(&err) => err,
            Err(err) => return Err(err),
        };

        let result = match self.client.list_listeners(&self.identity).await {
            Err(second) if is_conflict(&second) => ConflictResult::Myself {
                message: second.conflict_text(),
            },
            _ => ConflictResult::Other {
                message: first.conflict_text(),
            },
        };

        info!(
            mode = %self.identity.mode,
            result = ?result,
            "Listener conflict detected"
        );
        Ok(result)
    }

    /// Deletes the registered listener, releasing any long-poll on it.
    pub async fn teardown(&self) -> Result<(), RemoteError> {
        debug!(mode = %self.identity.mode, "Deleting remote listener");
        self.client.delete_listener(&self.identity).await
    }
}

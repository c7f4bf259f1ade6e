use std::sync::Arc;

use tracing::{debug, info, warn};

use super::DebugListener;
use crate::arbiter::SessionArbiter;
use crate::classifier::is_conflict;
use crate::domain::{ConflictResult, DebugEvent, ListenMode, ListenerState, SessionIdentity};
use crate::ports::RemoteClient;

impl DebugListener {
    /// Stops the listen loop and emits `Terminated`.
    ///
    /// With `stop_debugger` set, a listener still registered under the
    /// user-mode identity is deleted as well. The event is emitted exactly
    /// once per call whatever the remote side reports.
    #[tracing::instrument(
        skip(self),
        fields(session = self.session_number, connection = %self.connection_id)
    )]
    pub async fn stop_debugging(&self, stop_debugger: bool) {
        self.flags.deactivate();
        self.set_state(ListenerState::Terminating);

        if stop_debugger {
            let user = self.identity.with_mode(ListenMode::User);
            let registered = match self.remote_stateless.list_listeners(&user).await {
                Ok(listeners) => !listeners.is_empty(),
                Err(e) if is_conflict(&e) => true,
                Err(e) => {
                    debug!(error = %e, "Listener lookup failed, skipping remote teardown");
                    false
                }
            };

            if registered {
                if let Err(e) = self.remote_stateless.delete_listener(&user).await {
                    warn!(error = %e, "Failed to delete user listener");
                }
            }
        }

        self.emit(DebugEvent::Terminated);
        self.set_state(ListenerState::Terminated);
        info!("Debugging stopped");
    }

    /// Ends the remote session and kills this listener.
    ///
    /// A stale listener of ours is released in the background. When the
    /// client is still logged in, that cleanup is awaited before the session
    /// is dropped and both client handles log out. Every remote failure is
    /// logged and swallowed. Once this returns, remote calls through the
    /// listener fail with `Disconnected`.
    #[tracing::instrument(
        skip(self),
        fields(session = self.session_number, connection = %self.connection_id)
    )]
    pub async fn logout(&self) {
        self.flags.deactivate();
        self.flags.set_attached(false);

        if self.flags.is_killed() {
            debug!("Listener already logged out");
            return;
        }

        let cleanup = tokio::spawn(release_stale_listener(
            Arc::clone(&self.stateless),
            self.identity.clone(),
        ));

        if self.flags.kill() {
            return;
        }

        if !self.client.is_logged_in() {
            debug!("Client not logged in, leaving listener cleanup in background");
            return;
        }

        if let Err(e) = cleanup.await {
            warn!(error = %e, "Listener cleanup task failed");
        }
        if let Err(e) = self.client.drop_session().await {
            warn!(error = %e, "Failed to drop remote session");
        }
        if let Err(e) = self.client.logout().await {
            warn!(error = %e, "Failed to log out primary client");
        }
        if let Err(e) = self.stateless.logout().await {
            warn!(error = %e, "Failed to log out stateless client");
        }
        info!("Logged out");
    }
}

async fn release_stale_listener(client: Arc<dyn RemoteClient>, identity: SessionIdentity) {
    let arbiter = SessionArbiter::new(client, identity);
    match arbiter.probe().await {
        Ok(ConflictResult::Myself { .. }) => {
            if let Err(e) = arbiter.teardown().await {
                warn!(error = %e, "Failed to release stale listener");
            }
        }
        Ok(_) => {}
        Err(e) => debug!(error = %e, "Stale listener probe failed"),
    }
}

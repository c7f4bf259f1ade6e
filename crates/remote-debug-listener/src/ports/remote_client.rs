use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    ActiveListener, AttachRequest, AttachResult, DebuggerSettings, ListenResult, SessionIdentity,
};
use crate::error::RemoteError;

/// Remote debugging API consumed by the listener.
///
/// Wire format is owned by the implementation. `listen` blocks until the
/// backend resolves the long-poll; there is no client-side timeout, and the
/// only way to unblock it early is `delete_listener` for the same identity.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Long-poll for a stop. `Ok(None)` means the poll ended without a debuggee.
    async fn listen(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Option<ListenResult>, RemoteError>;

    /// Conflict probe: fails with a conflict sub-type when a listener is held.
    async fn list_listeners(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Vec<ActiveListener>, RemoteError>;

    async fn delete_listener(&self, identity: &SessionIdentity) -> Result<(), RemoteError>;

    async fn attach(&self, request: &AttachRequest) -> Result<AttachResult, RemoteError>;

    async fn save_settings(&self, settings: &DebuggerSettings) -> Result<(), RemoteError>;

    async fn drop_session(&self) -> Result<(), RemoteError>;

    async fn logout(&self) -> Result<(), RemoteError>;

    fn is_logged_in(&self) -> bool;

    /// Login name of the connected user.
    fn username(&self) -> String;

    /// Handle that shares credentials but not session state, used for
    /// side-channel calls while the primary session is busy.
    fn stateless_clone(&self) -> Arc<dyn RemoteClient>;
}

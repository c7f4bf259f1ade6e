use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::ListenerFlags;
use crate::domain::{
    ActiveListener, AttachRequest, AttachResult, DebuggerSettings, ListenResult, SessionIdentity,
};
use crate::error::RemoteError;
use crate::ports::RemoteClient;

/// Client handle that refuses every remote call once its listener is killed.
///
/// Rejected calls fail locally with `RemoteError::Disconnected` and never
/// reach the wrapped client.
pub struct GuardedClient {
    inner: Arc<dyn RemoteClient>,
    flags: Arc<ListenerFlags>,
}

impl GuardedClient {
    pub(crate) fn new(inner: Arc<dyn RemoteClient>, flags: Arc<ListenerFlags>) -> Self {
        Self { inner, flags }
    }

    fn check(&self, call: &'static str) -> Result<(), RemoteError> {
        if self.flags.is_killed() {
            debug!(call, "Rejecting remote call on killed listener");
            return Err(RemoteError::Disconnected);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteClient for GuardedClient {
    async fn listen(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Option<ListenResult>, RemoteError> {
        self.check("listen")?;
        self.inner.listen(identity).await
    }

    async fn list_listeners(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Vec<ActiveListener>, RemoteError> {
        self.check("list_listeners")?;
        self.inner.list_listeners(identity).await
    }

    async fn delete_listener(&self, identity: &SessionIdentity) -> Result<(), RemoteError> {
        self.check("delete_listener")?;
        self.inner.delete_listener(identity).await
    }

    async fn attach(&self, request: &AttachRequest) -> Result<AttachResult, RemoteError> {
        self.check("attach")?;
        self.inner.attach(request).await
    }

    async fn save_settings(&self, settings: &DebuggerSettings) -> Result<(), RemoteError> {
        self.check("save_settings")?;
        self.inner.save_settings(settings).await
    }

    async fn drop_session(&self) -> Result<(), RemoteError> {
        self.check("drop_session")?;
        self.inner.drop_session().await
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        self.check("logout")?;
        self.inner.logout().await
    }

    fn is_logged_in(&self) -> bool {
        !self.flags.is_killed() && self.inner.is_logged_in()
    }

    fn username(&self) -> String {
        self.inner.username()
    }

    fn stateless_clone(&self) -> Arc<dyn RemoteClient> {
        Arc::new(Self::new(
            self.inner.stateless_clone(),
            Arc::clone(&self.flags),
        ))
    }
}

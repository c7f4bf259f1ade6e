//! Scripted `RemoteClient` for exercising the listener without a backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use remote_debug_common::mutex_lock_or_recover;
use tokio::sync::Notify;

use crate::domain::{
    ActiveListener, AttachRequest, AttachResult, Debuggee, DebuggerSettings, ListenResult,
    ListenerFailure, SessionIdentity,
};
use crate::error::RemoteError;
use crate::ports::RemoteClient;

/// Which handle of the mock issued a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientHandle {
    Primary,
    Stateless,
}

/// A recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Listen(SessionIdentity),
    ListListeners(SessionIdentity),
    DeleteListener(SessionIdentity),
    Attach(AttachRequest),
    SaveSettings(DebuggerSettings),
    DropSession,
    Logout,
}

impl RemoteCall {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteCall::Listen(_) => "listen",
            RemoteCall::ListListeners(_) => "list_listeners",
            RemoteCall::DeleteListener(_) => "delete_listener",
            RemoteCall::Attach(_) => "attach",
            RemoteCall::SaveSettings(_) => "save_settings",
            RemoteCall::DropSession => "drop_session",
            RemoteCall::Logout => "logout",
        }
    }
}

type Script<T> = Mutex<VecDeque<Result<T, RemoteError>>>;

struct Shared {
    username: String,
    logged_in: AtomicBool,
    calls: Mutex<Vec<(ClientHandle, RemoteCall)>>,
    listen: Script<Option<ListenResult>>,
    list_listeners: Script<Vec<ActiveListener>>,
    delete_listener: Script<()>,
    attach: Script<AttachResult>,
    save_settings: Script<()>,
    drop_session: Script<()>,
    logout: Script<()>,
    release: Script<Option<ListenResult>>,
    released: Notify,
    blocked: AtomicUsize,
}

/// Mock remote client.
///
/// Each call pops the next scripted response for its method, falling back
/// to success when the script is empty. `listen` with an empty script
/// behaves like the real long-poll: it blocks until a successful
/// `delete_listener`, then returns the next `push_release` result or
/// `Ok(None)`. A delete with no poll waiting releases nothing; the next
/// `listen` blocks again.
///
/// Clones and `stateless_clone` share scripts and the call log; the log
/// records which handle issued each call.
#[derive(Clone)]
pub struct MockRemoteClient {
    shared: Arc<Shared>,
    handle: ClientHandle,
}

impl MockRemoteClient {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                username: username.into(),
                logged_in: AtomicBool::new(true),
                calls: Mutex::new(Vec::new()),
                listen: Mutex::new(VecDeque::new()),
                list_listeners: Mutex::new(VecDeque::new()),
                delete_listener: Mutex::new(VecDeque::new()),
                attach: Mutex::new(VecDeque::new()),
                save_settings: Mutex::new(VecDeque::new()),
                drop_session: Mutex::new(VecDeque::new()),
                logout: Mutex::new(VecDeque::new()),
                release: Mutex::new(VecDeque::new()),
                released: Notify::new(),
                blocked: AtomicUsize::new(0),
            }),
            handle: ClientHandle::Primary,
        }
    }

    pub fn handle(&self) -> ClientHandle {
        self.handle
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.shared.logged_in.store(logged_in, Ordering::SeqCst);
    }

    pub fn push_listen(&self, result: Result<Option<ListenResult>, RemoteError>) -> &Self {
        mutex_lock_or_recover(&self.shared.listen).push_back(result);
        self
    }

    /// Scripts a long-poll that returns a stopped debuggee.
    pub fn push_debuggee(&self, id: &str) -> &Self {
        self.push_listen(Ok(Some(ListenResult::Debuggee(Debuggee::new(id)))))
    }

    /// Scripts a long-poll that returns a listener-level failure.
    pub fn push_listener_failure(&self, kind: &str, message: &str) -> &Self {
        self.push_listen(Ok(Some(ListenResult::ListenerError(ListenerFailure {
            kind: kind.to_string(),
            message: message.to_string(),
        }))))
    }

    /// Scripts what a blocked long-poll returns once its listener is deleted.
    pub fn push_release(&self, result: Result<Option<ListenResult>, RemoteError>) -> &Self {
        mutex_lock_or_recover(&self.shared.release).push_back(result);
        self
    }

    pub fn push_list_listeners(&self, result: Result<Vec<ActiveListener>, RemoteError>) -> &Self {
        mutex_lock_or_recover(&self.shared.list_listeners).push_back(result);
        self
    }

    pub fn push_delete_listener(&self, result: Result<(), RemoteError>) -> &Self {
        mutex_lock_or_recover(&self.shared.delete_listener).push_back(result);
        self
    }

    pub fn push_attach(&self, result: Result<AttachResult, RemoteError>) -> &Self {
        mutex_lock_or_recover(&self.shared.attach).push_back(result);
        self
    }

    pub fn push_save_settings(&self, result: Result<(), RemoteError>) -> &Self {
        mutex_lock_or_recover(&self.shared.save_settings).push_back(result);
        self
    }

    pub fn push_drop_session(&self, result: Result<(), RemoteError>) -> &Self {
        mutex_lock_or_recover(&self.shared.drop_session).push_back(result);
        self
    }

    pub fn push_logout(&self, result: Result<(), RemoteError>) -> &Self {
        mutex_lock_or_recover(&self.shared.logout).push_back(result);
        self
    }

    /// All calls made through any handle, in order.
    pub fn calls(&self) -> Vec<(ClientHandle, RemoteCall)> {
        mutex_lock_or_recover(&self.shared.calls).clone()
    }

    /// Number of calls to the named method across all handles.
    pub fn call_count(&self, method: &str) -> usize {
        mutex_lock_or_recover(&self.shared.calls)
            .iter()
            .filter(|(_, call)| call.name() == method)
            .count()
    }

    /// Number of calls to the named method issued by one handle.
    pub fn call_count_from(&self, handle: ClientHandle, method: &str) -> usize {
        mutex_lock_or_recover(&self.shared.calls)
            .iter()
            .filter(|(h, call)| *h == handle && call.name() == method)
            .count()
    }

    /// Last recorded call to the named method.
    pub fn last_call(&self, method: &str) -> Option<RemoteCall> {
        mutex_lock_or_recover(&self.shared.calls)
            .iter()
            .rev()
            .find(|(_, call)| call.name() == method)
            .map(|(_, call)| call.clone())
    }

    /// Number of long-polls currently waiting for their listener to be deleted.
    pub fn blocked_listens(&self) -> usize {
        self.shared.blocked.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) {
        mutex_lock_or_recover(&self.shared.calls).clear();
    }

    fn record(&self, call: RemoteCall) {
        mutex_lock_or_recover(&self.shared.calls).push((self.handle, call));
    }

    fn next<T>(script: &Script<T>, default: impl FnOnce() -> T) -> Result<T, RemoteError> {
        mutex_lock_or_recover(script)
            .pop_front()
            .unwrap_or_else(|| Ok(default()))
    }
}

#[async_trait]
impl RemoteClient for MockRemoteClient {
    async fn listen(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Option<ListenResult>, RemoteError> {
        // Registered before the call is visible in the log, so a delete
        // issued after `call_count("listen")` moves is never missed.
        let released = self.shared.released.notified();
        self.record(RemoteCall::Listen(identity.clone()));
        let scripted = mutex_lock_or_recover(&self.shared.listen).pop_front();
        match scripted {
            Some(result) => result,
            None => {
                self.shared.blocked.fetch_add(1, Ordering::SeqCst);
                released.await;
                self.shared.blocked.fetch_sub(1, Ordering::SeqCst);
                Self::next(&self.shared.release, || None)
            }
        }
    }

    async fn list_listeners(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Vec<ActiveListener>, RemoteError> {
        self.record(RemoteCall::ListListeners(identity.clone()));
        Self::next(&self.shared.list_listeners, Vec::new)
    }

    async fn delete_listener(&self, identity: &SessionIdentity) -> Result<(), RemoteError> {
        self.record(RemoteCall::DeleteListener(identity.clone()));
        let result = Self::next(&self.shared.delete_listener, || ());
        if result.is_ok() {
            self.shared.released.notify_waiters();
        }
        result
    }

    async fn attach(&self, request: &AttachRequest) -> Result<AttachResult, RemoteError> {
        self.record(RemoteCall::Attach(request.clone()));
        Self::next(&self.shared.attach, || AttachResult {
            debug_session_id: format!("SESSION-{}", request.debuggee_id),
            is_stepping_possible: true,
        })
    }

    async fn save_settings(&self, settings: &DebuggerSettings) -> Result<(), RemoteError> {
        self.record(RemoteCall::SaveSettings(settings.clone()));
        Self::next(&self.shared.save_settings, || ())
    }

    async fn drop_session(&self) -> Result<(), RemoteError> {
        self.record(RemoteCall::DropSession);
        Self::next(&self.shared.drop_session, || ())
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        self.record(RemoteCall::Logout);
        let result = Self::next(&self.shared.logout, || ());
        if result.is_ok() && self.handle == ClientHandle::Primary {
            self.set_logged_in(false);
        }
        result
    }

    fn is_logged_in(&self) -> bool {
        self.shared.logged_in.load(Ordering::SeqCst)
    }

    fn username(&self) -> String {
        self.shared.username.clone()
    }

    fn stateless_clone(&self) -> Arc<dyn RemoteClient> {
        Arc::new(Self {
            shared: Arc::clone(&self.shared),
            handle: ClientHandle::Stateless,
        })
    }
}

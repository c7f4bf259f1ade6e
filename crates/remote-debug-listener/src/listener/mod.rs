//! One logical attempt to own the remote debug listener.
//!
//! A `DebugListener` arbitrates ownership, then runs the listen loop as a
//! spawned task. The loop is driven by the `active` watch channel: it checks
//! the channel before every long-poll and after every suspension point.
//! Deactivating does not interrupt a long-poll already in flight; only a
//! remote `delete_listener` releases it.

mod factory;
mod guarded;
mod lifecycle;
mod main_loop;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, watch};

pub use factory::ListenerFactory;
pub use guarded::GuardedClient;

use crate::arbiter::SessionArbiter;
use crate::domain::{ConnectionId, DebugEvent, ListenerState, SessionIdentity};
use crate::ports::{RemoteClient, UiSurface};

/// Flags shared between a listener, its loop task and its guarded clients.
pub(crate) struct ListenerFlags {
    active: watch::Sender<bool>,
    attached: AtomicBool,
    killed: AtomicBool,
}

impl ListenerFlags {
    pub(crate) fn new() -> Self {
        let (active, _) = watch::channel(false);
        Self {
            active,
            attached: AtomicBool::new(false),
            killed: AtomicBool::new(false),
        }
    }

    pub(crate) fn activate(&self) {
        self.active.send_replace(true);
    }

    pub(crate) fn deactivate(&self) {
        self.active.send_replace(false);
    }

    pub(crate) fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    pub(crate) fn subscribe_active(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    pub(crate) fn set_attached(&self, attached: bool) {
        self.attached.store(attached, Ordering::SeqCst);
    }

    pub(crate) fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// Marks the listener killed. Returns whether it already was.
    pub(crate) fn kill(&self) -> bool {
        self.killed.swap(true, Ordering::SeqCst)
    }
}

pub struct DebugListener {
    connection_id: ConnectionId,
    session_number: u32,
    identity: SessionIdentity,
    client: Arc<dyn RemoteClient>,
    stateless: Arc<dyn RemoteClient>,
    remote: Arc<dyn RemoteClient>,
    remote_stateless: Arc<dyn RemoteClient>,
    arbiter: SessionArbiter,
    ui: Arc<dyn UiSurface>,
    flags: Arc<ListenerFlags>,
    events: broadcast::Sender<DebugEvent>,
    state: watch::Sender<ListenerState>,
    running: watch::Sender<bool>,
}

impl DebugListener {
    pub fn new(
        connection_id: ConnectionId,
        session_number: u32,
        identity: SessionIdentity,
        client: Arc<dyn RemoteClient>,
        ui: Arc<dyn UiSurface>,
        event_capacity: usize,
    ) -> Arc<Self> {
        let flags = Arc::new(ListenerFlags::new());
        let stateless = client.stateless_clone();
        let remote: Arc<dyn RemoteClient> =
            Arc::new(GuardedClient::new(Arc::clone(&client), Arc::clone(&flags)));
        let remote_stateless: Arc<dyn RemoteClient> =
            Arc::new(GuardedClient::new(Arc::clone(&stateless), Arc::clone(&flags)));
        let arbiter = SessionArbiter::new(Arc::clone(&remote_stateless), identity.clone());
        let (events, _) = broadcast::channel(event_capacity.max(1));
        let (state, _) = watch::channel(ListenerState::Idle);
        let (running, _) = watch::channel(false);

        Arc::new(Self {
            connection_id,
            session_number,
            identity,
            client,
            stateless,
            remote,
            remote_stateless,
            arbiter,
            ui,
            flags,
            events,
            state,
            running,
        })
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn session_number(&self) -> u32 {
        self.session_number
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn is_active(&self) -> bool {
        self.flags.is_active()
    }

    pub fn is_attached(&self) -> bool {
        self.flags.is_attached()
    }

    pub fn is_killed(&self) -> bool {
        self.flags.is_killed()
    }

    /// Client for adjacent layers (stack, variables). Refuses calls once
    /// the listener is killed.
    pub fn remote(&self) -> Arc<dyn RemoteClient> {
        Arc::clone(&self.remote)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DebugEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    /// Waits for the listen loop task to finish. Returns immediately when no
    /// loop is running. Safe to cancel and call again.
    pub async fn join(&self) {
        let mut running = self.running.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = running.wait_for(|running| !*running).await;
    }

    fn emit(&self, event: DebugEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    fn set_state(&self, state: ListenerState) {
        self.state.send_replace(state);
    }
}

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use remote_debug_listener::test_support::{MockRemoteClient, MockUi};
use remote_debug_listener::{
    ConnectionId, DebugEvent, DebugListener, ListenMode, SessionIdentity, TerminalId, WorkspaceId,
};
use tokio::sync::broadcast;
use tokio::time::timeout;

pub const TIMEOUT: Duration = Duration::from_secs(2);

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let guard = remote_debug_common::init_tracing("warn");
        std::mem::forget(guard);
    });
}

pub fn identity() -> SessionIdentity {
    SessionIdentity::new(
        WorkspaceId::from("0A1B2C3D4E5F60718293A4B5C6D7E8F9"),
        TerminalId::from("F9E8D7C6B5A4938271605F4E3D2C1B0A"),
        "DEVELOPER",
        ListenMode::Terminal,
    )
}

pub fn listener(mock: &MockRemoteClient, ui: &Arc<MockUi>) -> Arc<DebugListener> {
    init_tracing();
    DebugListener::new(
        ConnectionId::from("DEV"),
        1,
        identity(),
        Arc::new(mock.clone()),
        ui.clone(),
        16,
    )
}

pub async fn next_event(events: &mut broadcast::Receiver<DebugEvent>) -> DebugEvent {
    timeout(TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for debug event")
        .expect("event channel closed")
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Releases the blocked long-poll and waits for the loop task to end.
pub async fn shut_down(listener: &Arc<DebugListener>, mock: &MockRemoteClient) {
    wait_until(|| mock.blocked_listens() > 0 || !listener.is_active()).await;
    listener.teardown(true).await;
    timeout(TIMEOUT, listener.join())
        .await
        .expect("listen loop did not exit");
}

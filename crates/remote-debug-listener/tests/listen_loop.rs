mod common;

use std::sync::Arc;

use common::{TIMEOUT, identity, listener, next_event, shut_down, wait_until};
use remote_debug_listener::test_support::{
    ClientHandle, MockRemoteClient, MockUi, RemoteCall, conflict_error, protocol_error,
    timeout_error,
};
use remote_debug_listener::{
    AttachRequest, DebugEvent, ListenMode, ListenerState, RemoteError, STOPPED_THREAD_ID,
};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::timeout;

#[tokio::test]
async fn self_conflict_is_torn_down_without_prompting() {
    let mock = MockRemoteClient::new("developer");
    mock.push_list_listeners(Err(conflict_error("conflictDetected", "listener exists")))
        .push_list_listeners(Err(conflict_error("conflictNotification", "listener exists")));
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);

    assert!(listener.fire_main_loop().await);

    assert!(ui.confirms().is_empty());
    assert_eq!(mock.call_count("delete_listener"), 1);
    assert_eq!(
        mock.last_call("delete_listener"),
        Some(RemoteCall::DeleteListener(identity()))
    );
    assert!(listener.is_active());

    // The delete happened before the first poll, so that poll still blocks.
    wait_until(|| mock.blocked_listens() == 1).await;
    assert_eq!(mock.call_count("listen"), 1);

    shut_down(&listener, &mock).await;
}

#[tokio::test]
async fn foreign_conflict_declined_never_listens() {
    let mock = MockRemoteClient::new("developer");
    mock.push_list_listeners(Err(conflict_error("conflictNotification", "held by BOB")))
        .push_list_listeners(Ok(vec![]));
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);

    assert!(!listener.fire_main_loop().await);

    let confirms = ui.confirms();
    assert_eq!(confirms.len(), 1);
    assert!(confirms[0].contains("held by BOB"));
    assert!(confirms[0].contains("Take over debugging?"));
    assert_eq!(mock.call_count("listen"), 0);
    assert_eq!(mock.call_count("delete_listener"), 0);
    assert!(!listener.is_active());
    assert_eq!(listener.state(), ListenerState::Idle);
    listener.join().await;
}

#[tokio::test]
async fn foreign_conflict_accepted_takes_over() {
    let mock = MockRemoteClient::new("developer");
    mock.push_list_listeners(Err(conflict_error("conflictNotification", "held by BOB")))
        .push_list_listeners(Ok(vec![]));
    let ui = Arc::new(MockUi::answering(true));
    let listener = listener(&mock, &ui);

    assert!(listener.fire_main_loop().await);

    assert_eq!(ui.confirms().len(), 1);
    assert_eq!(mock.call_count("delete_listener"), 1);
    wait_until(|| mock.blocked_listens() == 1).await;
    assert_eq!(mock.call_count("listen"), 1);

    shut_down(&listener, &mock).await;
}

#[tokio::test]
async fn arbitration_failure_is_reported_and_not_started() {
    let mock = MockRemoteClient::new("developer");
    mock.push_list_listeners(Err(RemoteError::transport("connection refused")));
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);

    assert!(!listener.fire_main_loop().await);

    let errors = ui.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Error listening to debugger:"));
    assert!(errors[0].contains("connection refused"));
    assert_eq!(mock.call_count("listen"), 0);
}

#[tokio::test]
async fn breakpoint_attaches_once_and_emits_stopped() {
    let mock = MockRemoteClient::new("developer");
    mock.push_debuggee("D123");
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);
    let mut events = listener.subscribe();

    assert!(listener.fire_main_loop().await);

    assert_eq!(
        next_event(&mut events).await,
        DebugEvent::Stopped {
            reason: "breakpoint".into(),
            thread_id: STOPPED_THREAD_ID,
        }
    );
    assert!(listener.is_attached());
    assert_eq!(listener.state(), ListenerState::Stopped);
    assert_eq!(
        mock.last_call("attach"),
        Some(RemoteCall::Attach(AttachRequest {
            mode: ListenMode::Terminal,
            debuggee_id: "D123".into(),
            username: "DEVELOPER".into(),
            stop_on_attach: true,
        }))
    );
    assert_eq!(mock.call_count_from(ClientHandle::Primary, "attach"), 1);
    assert_eq!(mock.call_count("save_settings"), 1);

    wait_until(|| mock.call_count("listen") >= 2).await;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    shut_down(&listener, &mock).await;
}

#[tokio::test]
async fn later_stops_reuse_the_attachment() {
    let mock = MockRemoteClient::new("developer");
    mock.push_debuggee("D1").push_debuggee("D2");
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);
    let mut events = listener.subscribe();

    assert!(listener.fire_main_loop().await);

    assert_eq!(next_event(&mut events).await, DebugEvent::breakpoint());
    assert_eq!(next_event(&mut events).await, DebugEvent::breakpoint());
    assert_eq!(mock.call_count("attach"), 1);

    shut_down(&listener, &mock).await;
}

#[tokio::test]
async fn attach_failure_stops_debugging() {
    let mock = MockRemoteClient::new("developer");
    mock.push_debuggee("D123")
        .push_attach(Err(protocol_error("Debuggee no longer available")));
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);
    let mut events = listener.subscribe();

    assert!(listener.fire_main_loop().await);

    assert_eq!(next_event(&mut events).await, DebugEvent::Terminated);
    timeout(TIMEOUT, listener.join())
        .await
        .expect("listen loop did not exit");
    assert!(!listener.is_attached());
    assert!(!listener.is_active());
    assert_eq!(listener.state(), ListenerState::Terminated);
    assert_eq!(mock.call_count("save_settings"), 0);
}

#[tokio::test]
async fn unclassified_error_confirmed_close_stops_once() {
    let mock = MockRemoteClient::new("developer");
    mock.push_listen(Err(protocol_error("Internal server error")));
    let ui = Arc::new(MockUi::answering(true));
    let listener = listener(&mock, &ui);
    let mut events = listener.subscribe();

    assert!(listener.fire_main_loop().await);

    assert_eq!(next_event(&mut events).await, DebugEvent::Terminated);
    timeout(TIMEOUT, listener.join())
        .await
        .expect("listen loop did not exit");

    let confirms = ui.confirms();
    assert_eq!(confirms.len(), 1);
    assert!(confirms[0].contains("Internal server error"));
    assert!(confirms[0].ends_with("Close session?"));

    // One probe during arbitration, one user-mode lookup while stopping.
    assert_eq!(mock.call_count("list_listeners"), 2);
    match mock.last_call("list_listeners") {
        Some(RemoteCall::ListListeners(identity)) => assert_eq!(identity.mode, ListenMode::User),
        other => panic!("unexpected call {:?}", other),
    }
    assert_eq!(mock.call_count("listen"), 1);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn unclassified_error_declined_keeps_listening() {
    let mock = MockRemoteClient::new("developer");
    mock.push_listen(Err(protocol_error("Internal server error")));
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);

    assert!(listener.fire_main_loop().await);

    ui.wait_for_confirms(1).await;
    wait_until(|| mock.call_count("listen") >= 2).await;
    assert!(listener.is_active());

    shut_down(&listener, &mock).await;
}

#[tokio::test]
async fn conflict_mid_loop_stops_without_remote_teardown() {
    let mock = MockRemoteClient::new("developer");
    mock.push_listen(Err(conflict_error(
        "conflictNotification",
        "Debugger taken over by BOB",
    )));
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);
    let mut events = listener.subscribe();

    assert!(listener.fire_main_loop().await);

    assert_eq!(next_event(&mut events).await, DebugEvent::Terminated);
    timeout(TIMEOUT, listener.join())
        .await
        .expect("listen loop did not exit");

    assert_eq!(ui.errors(), vec!["Debugger taken over by BOB"]);
    assert!(ui.confirms().is_empty());
    assert_eq!(mock.call_count("delete_listener"), 0);
    assert_eq!(mock.call_count("list_listeners"), 1);
}

#[tokio::test]
async fn unstructured_error_is_shown_and_loop_continues() {
    let mock = MockRemoteClient::new("developer");
    mock.push_listen(Err(RemoteError::transport("connection reset by peer")));
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);

    assert!(listener.fire_main_loop().await);

    let errors = ui.wait_for_errors(1).await;
    assert!(errors[0].contains("connection reset by peer"));
    wait_until(|| mock.call_count("listen") >= 2).await;
    assert!(listener.is_active());
    assert!(ui.confirms().is_empty());

    shut_down(&listener, &mock).await;
}

#[tokio::test]
async fn long_poll_timeout_is_silent() {
    let mock = MockRemoteClient::new("developer");
    mock.push_listen(Err(timeout_error()));
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);

    assert!(listener.fire_main_loop().await);

    wait_until(|| mock.call_count("listen") >= 2).await;
    assert!(ui.errors().is_empty());
    assert!(ui.confirms().is_empty());
    assert!(listener.is_active());
    assert_eq!(listener.state(), ListenerState::Listening);

    shut_down(&listener, &mock).await;
}

#[tokio::test]
async fn listener_error_leaves_the_loop() {
    let mock = MockRemoteClient::new("developer");
    mock.push_listener_failure("listenerRemoved", "Listener was removed");
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);
    let mut events = listener.subscribe();

    assert!(listener.fire_main_loop().await);

    timeout(TIMEOUT, listener.join())
        .await
        .expect("listen loop did not exit");
    assert!(!listener.is_active());
    assert_eq!(listener.state(), ListenerState::Idle);
    assert_eq!(mock.call_count("listen"), 1);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn deactivating_alone_does_not_release_the_long_poll() {
    let mock = MockRemoteClient::new("developer");
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);

    assert!(listener.fire_main_loop().await);
    wait_until(|| mock.call_count("listen") >= 1).await;

    let user_listeners = mock.call_count("delete_listener");
    listener.stop_debugging(true).await;
    assert_eq!(mock.call_count("delete_listener"), user_listeners);

    // The long-poll is still held by the backend.
    assert!(timeout(std::time::Duration::from_millis(50), listener.join())
        .await
        .is_err());

    listener.teardown(false).await;
    timeout(TIMEOUT, listener.join())
        .await
        .expect("listen loop did not exit after teardown");
    assert_eq!(mock.call_count("listen"), 1);
}

#[tokio::test]
async fn loop_returns_to_idle_when_released_poll_fails() {
    let mock = MockRemoteClient::new("developer");
    mock.push_release(Err(protocol_error("Listener was deleted")));
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);
    let mut states = listener.watch_state();

    assert!(listener.fire_main_loop().await);
    wait_until(|| mock.blocked_listens() == 1).await;
    assert_eq!(*states.borrow_and_update(), ListenerState::Listening);

    shut_down(&listener, &mock).await;

    assert!(!listener.is_active());
    assert_eq!(listener.state(), ListenerState::Idle);
    assert_eq!(*states.borrow_and_update(), ListenerState::Idle);
    assert!(ui.errors().is_empty());
    assert!(ui.confirms().is_empty());
    assert_eq!(mock.call_count("listen"), 1);
}

#[tokio::test]
async fn loop_exit_after_conflict_keeps_terminated_state() {
    let mock = MockRemoteClient::new("developer");
    mock.push_listen(Err(conflict_error("conflictDetected", "Taken over")));
    let ui = Arc::new(MockUi::new());
    let listener = listener(&mock, &ui);

    assert!(listener.fire_main_loop().await);
    timeout(TIMEOUT, listener.join())
        .await
        .expect("listen loop did not exit");

    assert_eq!(listener.state(), ListenerState::Terminated);
}

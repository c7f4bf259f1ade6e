use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::DebugListener;
use crate::classifier::{ErrorKind, classify};
use crate::domain::{
    AttachRequest, ConflictResult, DebugEvent, Debuggee, DebuggerSettings, ListenResult,
    ListenerState,
};
use crate::error::{DebugError, RemoteError};

const DEFAULT_CONFLICT_PROMPT: &str = "Debugger conflict detected";
const TERMINATED_BY_OTHER: &str = "Debugger terminated by another session/user";

enum LoopControl {
    Continue,
    Exit,
}

/// Clears the running flag when the loop task ends, including by panic.
struct RunningGuard<'a>(&'a watch::Sender<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl DebugListener {
    /// Arbitrates ownership of the remote listener and starts the listen
    /// loop. Returns whether the loop was started.
    ///
    /// Arbitration failures are reported through the UI error sink.
    #[tracing::instrument(
        skip(self),
        fields(session = self.session_number, connection = %self.connection_id)
    )]
    pub async fn fire_main_loop(self: &Arc<Self>) -> bool {
        self.set_state(ListenerState::Arbitrating);

        let started = match self.arbiter.probe().await {
            Ok(ConflictResult::None) => {
                self.start();
                true
            }
            Ok(ConflictResult::Myself { .. }) => {
                info!("Taking over stale listener from this session");
                self.teardown(false).await;
                self.start();
                true
            }
            Ok(ConflictResult::Other { message }) => {
                let prompt = format!(
                    "{} Take over debugging?",
                    message.as_deref().unwrap_or(DEFAULT_CONFLICT_PROMPT)
                );
                if self.ui.confirm(&prompt).await {
                    info!("Taking over listener from another session");
                    self.teardown(false).await;
                    self.start();
                    true
                } else {
                    info!("Takeover declined, listener not started");
                    false
                }
            }
            Err(e) => {
                warn!(error = %e, "Listener arbitration failed");
                self.ui
                    .show_error(&format!("Error listening to debugger: {}", e));
                false
            }
        };

        if !started {
            self.set_state(ListenerState::Idle);
        }
        started
    }

    /// Deletes the remote listener for this identity. When `mark_inactive`
    /// is set the loop is told to stop first, so it exits once the released
    /// long-poll returns. Failures are logged and swallowed.
    pub async fn teardown(&self, mark_inactive: bool) {
        if mark_inactive {
            self.flags.deactivate();
        }
        if let Err(e) = self.arbiter.teardown().await {
            warn!(
                session = self.session_number,
                error = %e,
                "Failed to delete remote listener"
            );
        }
    }

    fn start(self: &Arc<Self>) {
        self.flags.activate();
        self.set_state(ListenerState::Listening);

        self.running.send_replace(true);
        let listener = Arc::clone(self);
        tokio::spawn(async move { listener.run().await });
    }

    async fn run(self: Arc<Self>) {
        let _running = RunningGuard(&self.running);
        let mut active = self.flags.subscribe_active();
        let mut iteration: u64 = 0;

        loop {
            let keep_listening = *active.borrow_and_update();
            if !keep_listening {
                break;
            }
            iteration += 1;
            debug!(
                session = self.session_number,
                connection = %self.connection_id,
                mode = %self.identity.mode,
                iteration,
                "Listening for debuggee"
            );

            let started = Instant::now();
            let outcome = self.remote_stateless.listen(&self.identity).await;
            debug!(
                session = self.session_number,
                connection = %self.connection_id,
                iteration,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Listen call returned"
            );

            let still_active = *active.borrow();
            match outcome {
                Ok(_) if !still_active => continue,
                Ok(None) => continue,
                Ok(Some(ListenResult::ListenerError(failure))) => {
                    warn!(
                        session = self.session_number,
                        kind = %failure.kind,
                        message = %failure.message,
                        "Listener reported an error, leaving listen loop"
                    );
                    self.flags.deactivate();
                    break;
                }
                Ok(Some(ListenResult::Debuggee(debuggee))) => self.on_breakpoint(debuggee).await,
                Err(_) if !still_active => break,
                Err(e) => match self.handle_listen_error(e).await {
                    LoopControl::Continue => continue,
                    LoopControl::Exit => break,
                },
            }
        }

        self.state.send_if_modified(|state| match state {
            ListenerState::Terminating | ListenerState::Terminated => false,
            _ => {
                *state = ListenerState::Idle;
                true
            }
        });
        debug!(session = self.session_number, "Listen loop finished");
    }

    async fn on_breakpoint(&self, debuggee: Debuggee) {
        self.set_state(ListenerState::Attaching);

        if let Err(e) = self.attach_and_notify(&debuggee).await {
            error!(
                session = self.session_number,
                debuggee = %debuggee.id,
                error = %e,
                "Failed to attach to debuggee"
            );
            self.stop_debugging(true).await;
        }
    }

    async fn attach_and_notify(&self, debuggee: &Debuggee) -> Result<(), DebugError> {
        if !self.flags.is_attached() {
            let request = AttachRequest {
                mode: self.identity.mode,
                debuggee_id: debuggee.id.clone(),
                username: self.identity.username.clone(),
                stop_on_attach: true,
            };
            let attached = self
                .remote
                .attach(&request)
                .await
                .map_err(DebugError::Attach)?;
            self.flags.set_attached(true);
            info!(
                session = self.session_number,
                debuggee = %debuggee.id,
                debug_session = %attached.debug_session_id,
                "Attached to debuggee"
            );

            self.remote
                .save_settings(&DebuggerSettings::default())
                .await?;
        }

        self.set_state(ListenerState::Stopped);
        self.emit(DebugEvent::breakpoint());
        Ok(())
    }

    async fn handle_listen_error(&self, err: RemoteError) -> LoopControl {
        match classify(&err) {
            ErrorKind::Unstructured => {
                warn!(session = self.session_number, error = %err, "Listen call failed");
                self.ui.show_error(&err.to_string());
                LoopControl::Continue
            }
            ErrorKind::Conflict(kind) => {
                warn!(
                    session = self.session_number,
                    conflict = ?kind,
                    "Listener taken over by another session"
                );
                let message = err
                    .conflict_text()
                    .unwrap_or_else(|| TERMINATED_BY_OTHER.to_string());
                self.ui.show_error(&message);
                self.stop_debugging(false).await;
                LoopControl::Exit
            }
            ErrorKind::AttachTimeout => {
                debug!(session = self.session_number, "Listen call timed out");
                self.set_state(ListenerState::Reconnecting);
                self.refresh();
                self.set_state(ListenerState::Listening);
                LoopControl::Continue
            }
            ErrorKind::Unclassified { subtype } => {
                warn!(
                    session = self.session_number,
                    subtype = ?subtype,
                    error = %err,
                    "Unexpected debugger error"
                );
                let close = self
                    .ui
                    .confirm(&format!("Error listening to debugger: {} Close session?", err))
                    .await;
                if close {
                    self.stop_debugging(true).await;
                    LoopControl::Exit
                } else {
                    LoopControl::Continue
                }
            }
        }
    }

    /// Hook run after a long-poll timeout. Intentionally does nothing; the
    /// loop simply polls again.
    fn refresh(&self) {}
}

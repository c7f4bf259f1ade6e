pub mod types;

pub use types::{
    ActiveListener, AttachRequest, AttachResult, ConflictResult, ConnectionId, DebugEvent,
    Debuggee, DebuggerSettings, ListenMode, ListenResult, ListenerFailure, ListenerState,
    STOPPED_THREAD_ID, SessionIdentity, TerminalId, WorkspaceId,
};

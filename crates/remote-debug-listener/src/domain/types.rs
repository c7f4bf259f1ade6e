//! Value types shared by the arbiter, the listen loop and the remote ports.

use std::fmt;
use std::ops::Deref;

use serde::Deserialize;
use serde::Serialize;

/// Thread id reported with every breakpoint stop. The backend exposes a
/// single debuggee thread per attached session.
pub const STOPPED_THREAD_ID: i64 = 1;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identity of the backend a listener targets.
    ConnectionId
);
string_id!(
    /// Per-workspace identifier, persisted under the `ideId` key.
    WorkspaceId
);
string_id!(
    /// Per-machine identifier shared by every session on the host.
    TerminalId
);

/// Which listener namespace the backend should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenMode {
    /// Stops are delivered only for requests issued from this terminal.
    Terminal,
    /// Stops are delivered for any request issued by the user.
    User,
}

impl ListenMode {
    pub fn from_terminal_flag(terminal_mode: bool) -> Self {
        if terminal_mode {
            ListenMode::Terminal
        } else {
            ListenMode::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListenMode::Terminal => "terminal",
            ListenMode::User => "user",
        }
    }
}

impl fmt::Display for ListenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity tuple a listener registers under.
///
/// Immutable for the lifetime of a listener instance. At most one active
/// listener per tuple should hold the remote registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub workspace_id: WorkspaceId,
    pub terminal_id: TerminalId,
    pub username: String,
    pub mode: ListenMode,
}

impl SessionIdentity {
    pub fn new(
        workspace_id: WorkspaceId,
        terminal_id: TerminalId,
        username: impl Into<String>,
        mode: ListenMode,
    ) -> Self {
        Self {
            workspace_id,
            terminal_id,
            username: username.into(),
            mode,
        }
    }

    /// Same identity under a different listener namespace.
    pub fn with_mode(&self, mode: ListenMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }
}

/// A stopped remote process that can be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debuggee {
    #[serde(rename = "DEBUGGEE_ID")]
    pub id: String,
    #[serde(rename = "DEBUGGEE_USER", default)]
    pub user: Option<String>,
    #[serde(rename = "PRG_CURR", default)]
    pub program: Option<String>,
}

impl Debuggee {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user: None,
            program: None,
        }
    }
}

/// Listener-level failure returned in place of a debuggee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerFailure {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// What a completed long-poll produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenResult {
    Debuggee(Debuggee),
    ListenerError(ListenerFailure),
}

/// A listener the backend currently holds for an identity tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveListener {
    pub username: String,
    pub terminal_id: String,
    pub ide_id: String,
}

/// Parameters of the attach call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequest {
    pub mode: ListenMode,
    pub debuggee_id: String,
    pub username: String,
    pub stop_on_attach: bool,
}

/// Result of a successful attach.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct AttachResult {
    #[serde(default)]
    pub debug_session_id: String,
    #[serde(default)]
    pub is_stepping_possible: bool,
}

/// Debugger settings persisted after attaching. The listener always saves
/// the empty default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebuggerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_debugging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_exception_object: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_rfc: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_objects_debugging: Option<bool>,
}

/// Who else holds the listener for our identity tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictResult {
    None,
    Other { message: Option<String> },
    Myself { message: Option<String> },
}

/// Notifications delivered to the debug-adapter layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    Stopped { reason: String, thread_id: i64 },
    Terminated,
}

impl DebugEvent {
    pub fn breakpoint() -> Self {
        DebugEvent::Stopped {
            reason: "breakpoint".to_string(),
            thread_id: STOPPED_THREAD_ID,
        }
    }
}

/// Observable phase of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Arbitrating,
    Listening,
    Attaching,
    Stopped,
    Reconnecting,
    Terminating,
    Terminated,
}

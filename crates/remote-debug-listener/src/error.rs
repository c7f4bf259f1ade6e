//! Errors raised by remote calls and by the listener itself.
//!
//! `RemoteError` is what a `RemoteClient` returns. `DebugError` is what
//! escapes this crate: setup failures and arbitration failures. Conflicts and
//! unclassified errors seen inside the listen loop are handled there and
//! never surface as `DebugError`.

use std::collections::HashMap;
use std::fmt;

use serde_json::{Value, json};
use thiserror::Error;

/// Property carrying the backend's structured error sub-type.
pub const SUBTYPE_PROPERTY: &str = "com.sap.adt.communicationFramework.subType";

/// Property carrying a human readable description of a listener conflict.
pub const CONFLICT_TEXT_PROPERTY: &str = "conflictText";

/// A structured error returned by the remote debugging protocol.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtocolError {
    pub message: String,
    pub properties: HashMap<String, String>,
    pub response_body: Option<String>,
}

impl ProtocolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.response_body = Some(body.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Failure of a call issued through a `RemoteClient`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("{0}")]
    Protocol(ProtocolError),
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        response_body: Option<String>,
    },
    #[error("Disconnected")]
    Disconnected,
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        RemoteError::Transport {
            message: message.into(),
            response_body: None,
        }
    }

    pub fn response_body(&self) -> Option<&str> {
        match self {
            RemoteError::Protocol(err) => err.response_body.as_deref(),
            RemoteError::Transport { response_body, .. } => response_body.as_deref(),
            RemoteError::Disconnected => None,
        }
    }

    /// Text describing a conflict, falling back to the error message.
    pub fn conflict_text(&self) -> Option<String> {
        match self {
            RemoteError::Protocol(err) => err
                .property(CONFLICT_TEXT_PROPERTY)
                .map(str::to_string)
                .or_else(|| (!err.message.is_empty()).then(|| err.message.clone())),
            _ => None,
        }
    }
}

impl From<ProtocolError> for RemoteError {
    fn from(err: ProtocolError) -> Self {
        RemoteError::Protocol(err)
    }
}

/// Error category for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Listener or client not available
    NotFound,
    /// Remote or transport failure
    External,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::External => "external",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that escape the listener.
#[derive(Error, Debug)]
pub enum DebugError {
    #[error("No client for connection {0}")]
    NoClient(String),
    #[error("Unable to read terminal id from registry key {key}: {reason}")]
    RegistryUnreadable { key: String, reason: String },
    #[error("{0}")]
    Remote(#[from] RemoteError),
    #[error("Attach failed: {0}")]
    Attach(RemoteError),
    #[error("Persistence error during {operation}: {reason}")]
    Persistence { operation: String, reason: String },
}

impl DebugError {
    pub fn persistence(operation: &str, err: impl fmt::Display) -> Self {
        DebugError::Persistence {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }

    /// Returns the error category for programmatic handling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            DebugError::NoClient(_) => ErrorCategory::NotFound,
            DebugError::RegistryUnreadable { .. }
            | DebugError::Remote(_)
            | DebugError::Attach(_)
            | DebugError::Persistence { .. } => ErrorCategory::External,
        }
    }

    /// Returns structured context about the error for debugging.
    pub fn context(&self) -> Value {
        match self {
            DebugError::NoClient(connection) => json!({ "connection": connection }),
            DebugError::RegistryUnreadable { key, reason } => {
                json!({ "key": key, "reason": reason })
            }
            DebugError::Remote(err) | DebugError::Attach(err) => remote_context(err),
            DebugError::Persistence { operation, reason } => {
                json!({ "operation": operation, "reason": reason })
            }
        }
    }

    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> String {
        match self {
            DebugError::NoClient(connection) => {
                format!("Connect to '{}' before starting the debugger.", connection)
            }
            DebugError::RegistryUnreadable { .. } => {
                "The terminal id is written by the companion tooling. Install or run it once, then retry.".to_string()
            }
            DebugError::Remote(_) => "Check the connection to the backend and retry.".to_string(),
            DebugError::Attach(_) => {
                "The debuggee could not be attached. Trigger the breakpoint again.".to_string()
            }
            DebugError::Persistence { .. } => {
                "Check that the home directory and workspace state are writable.".to_string()
            }
        }
    }

    /// Returns whether this error is potentially transient and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            DebugError::Remote(RemoteError::Transport { .. }) => true,
            DebugError::Persistence { .. } => true,
            _ => false,
        }
    }
}

fn remote_context(err: &RemoteError) -> Value {
    match err {
        RemoteError::Protocol(protocol) => json!({
            "message": protocol.message,
            "subtype": protocol.property(SUBTYPE_PROPERTY),
        }),
        RemoteError::Transport { message, .. } => json!({ "message": message }),
        RemoteError::Disconnected => json!({ "message": "disconnected" }),
    }
}

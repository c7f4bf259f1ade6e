//! Maps remote failures onto a closed set of error kinds.
//!
//! The backend reports listener conflicts through a sub-type property on a
//! structured error. Long-poll timeouts raised below the protocol layer only
//! show up as text in the response body, so the body is scanned as a
//! fallback.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{RemoteError, SUBTYPE_PROPERTY};

/// Which conflict sub-type the backend reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Notification,
    Detected,
}

/// Classification of a failed remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Another listener holds our identity tuple.
    Conflict(ConflictKind),
    /// The long-poll timed out below the protocol layer.
    AttachTimeout,
    /// A protocol error whose sub-type is missing or unknown.
    Unclassified { subtype: Option<String> },
    /// Not a remote-protocol error at all.
    Unstructured,
}

impl ErrorKind {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ErrorKind::Conflict(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::AttachTimeout)
    }
}

static TIMEOUT_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)connection\s+timed\s+out").expect("Invalid timeout signature regex")
});

fn parse_subtype(subtype: &str) -> Option<ConflictKind> {
    if subtype.contains("conflictNotification") {
        Some(ConflictKind::Notification)
    } else if subtype.contains("conflictDetected") {
        Some(ConflictKind::Detected)
    } else {
        None
    }
}

fn body_signals_timeout(error: &RemoteError) -> bool {
    error
        .response_body()
        .is_some_and(|body| TIMEOUT_SIGNATURE.is_match(body))
}

/// Classifies a failed remote call. Never fails: anything that cannot be
/// read degrades to `Unclassified` or `Unstructured`.
pub fn classify(error: &RemoteError) -> ErrorKind {
    match error {
        RemoteError::Protocol(protocol) => match protocol.property(SUBTYPE_PROPERTY) {
            Some(subtype) if !subtype.is_empty() => match parse_subtype(subtype) {
                Some(kind) => ErrorKind::Conflict(kind),
                None => ErrorKind::Unclassified {
                    subtype: Some(subtype.to_string()),
                },
            },
            _ if body_signals_timeout(error) => ErrorKind::AttachTimeout,
            _ => ErrorKind::Unclassified { subtype: None },
        },
        RemoteError::Transport { .. } if body_signals_timeout(error) => ErrorKind::AttachTimeout,
        RemoteError::Transport { .. } | RemoteError::Disconnected => ErrorKind::Unstructured,
    }
}

/// True iff the error is a listener conflict.
pub fn is_conflict(error: &RemoteError) -> bool {
    classify(error).is_conflict()
}

//! Test doubles for the listener's collaborators.
//!
//! Compiled unconditionally so integration tests and downstream crates can
//! drive a listener without a backend or an editor.

mod mock_remote;
mod mock_ui;

use std::collections::HashMap;
use std::sync::Mutex;

use remote_debug_common::mutex_lock_or_recover;

pub use mock_remote::{ClientHandle, MockRemoteClient, RemoteCall};
pub use mock_ui::MockUi;

use crate::error::{
    CONFLICT_TEXT_PROPERTY, DebugError, ProtocolError, RemoteError, SUBTYPE_PROPERTY,
};
use crate::ports::{RegistryReader, WorkspaceState};

/// In-memory workspace state.
#[derive(Debug, Default)]
pub struct MemoryWorkspaceState {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryWorkspaceState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkspaceState for MemoryWorkspaceState {
    fn get(&self, key: &str) -> Option<String> {
        mutex_lock_or_recover(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DebugError> {
        mutex_lock_or_recover(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Registry reader returning a fixed value for every lookup.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistryReader {
    value: Option<String>,
}

impl StaticRegistryReader {
    pub fn empty() -> Self {
        Self { value: None }
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }
}

impl RegistryReader for StaticRegistryReader {
    fn read(&self, _key: &str, _value: &str) -> Option<String> {
        self.value.clone()
    }
}

/// A structured error carrying a conflict sub-type and its description.
pub fn conflict_error(subtype: &str, text: &str) -> RemoteError {
    ProtocolError::new(text)
        .with_property(SUBTYPE_PROPERTY, subtype)
        .with_property(CONFLICT_TEXT_PROPERTY, text)
        .into()
}

/// A structured error without a sub-type.
pub fn protocol_error(message: &str) -> RemoteError {
    ProtocolError::new(message).into()
}

/// A transport failure whose body carries the long-poll timeout signature.
pub fn timeout_error() -> RemoteError {
    RemoteError::Transport {
        message: "gateway closed the connection".to_string(),
        response_body: Some("ICM_HTTP_TIMEOUT: Connection timed out".to_string()),
    }
}

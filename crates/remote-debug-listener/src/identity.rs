//! Stable identifiers that tie a listener to a workspace and a machine.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, Mutex};

use remote_debug_common::mutex_lock_or_recover;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::TerminalIdSource;
use crate::domain::{TerminalId, WorkspaceId};
use crate::error::DebugError;
use crate::ports::{RegQueryReader, RegistryReader, WorkspaceState};

/// Workspace state key holding the workspace id.
pub const WORKSPACE_ID_KEY: &str = "ideId";

/// A fresh identifier: 32 uppercase hex characters.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string().to_uppercase()
}

/// Supplies the workspace id and the terminal id for new listeners.
pub struct IdentityProvider {
    state: Arc<dyn WorkspaceState>,
    terminal_source: TerminalIdSource,
    registry: Arc<dyn RegistryReader>,
    workspace_id: Mutex<Option<WorkspaceId>>,
    terminal_id: Mutex<Option<TerminalId>>,
}

impl IdentityProvider {
    pub fn new(state: Arc<dyn WorkspaceState>, terminal_source: TerminalIdSource) -> Self {
        Self::with_registry(state, terminal_source, Arc::new(RegQueryReader))
    }

    pub fn with_registry(
        state: Arc<dyn WorkspaceState>,
        terminal_source: TerminalIdSource,
        registry: Arc<dyn RegistryReader>,
    ) -> Self {
        Self {
            state,
            terminal_source,
            registry,
            workspace_id: Mutex::new(None),
            terminal_id: Mutex::new(None),
        }
    }

    /// Returns the workspace id, generating and storing one on first use.
    pub fn get_or_create_workspace_id(&self) -> Result<WorkspaceId, DebugError> {
        let mut cached = mutex_lock_or_recover(&self.workspace_id);
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let id = match self.state.get(WORKSPACE_ID_KEY) {
            Some(stored) if !stored.trim().is_empty() => WorkspaceId::new(stored),
            _ => {
                let generated = generate_id();
                self.state.set(WORKSPACE_ID_KEY, &generated)?;
                info!(workspace_id = %generated, "Generated workspace id");
                WorkspaceId::new(generated)
            }
        };

        *cached = Some(id.clone());
        Ok(id)
    }

    /// Returns the terminal id from the configured source.
    pub fn get_or_create_terminal_id(&self) -> Result<TerminalId, DebugError> {
        let mut cached = mutex_lock_or_recover(&self.terminal_id);
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let id = match &self.terminal_source {
            TerminalIdSource::Registry { key, value } => self
                .registry
                .read(key, value)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
                .map(TerminalId::new)
                .ok_or_else(|| DebugError::RegistryUnreadable {
                    key: format!("{}\\{}", key, value),
                    reason: "value not found".to_string(),
                })?,
            TerminalIdSource::File(path) => read_or_create_terminal_id(path)?,
        };

        *cached = Some(id.clone());
        Ok(id)
    }
}

fn read_terminal_id(path: &Path) -> Result<Option<TerminalId>, DebugError> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            Ok((!trimmed.is_empty()).then(|| TerminalId::new(trimmed)))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DebugError::persistence(
            "read_terminal_id",
            format!("Failed to read '{}': {}", path.display(), e),
        )),
    }
}

/// Reads the terminal id file, creating it when missing or empty.
///
/// Two processes creating the file at once may both write; the file is
/// re-read afterwards so both settle on whichever write landed last.
fn read_or_create_terminal_id(path: &Path) -> Result<TerminalId, DebugError> {
    if let Some(id) = read_terminal_id(path)? {
        debug!(path = %path.display(), "Reusing terminal id");
        return Ok(id);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            DebugError::persistence(
                "create_dir",
                format!("Failed to create directory '{}': {}", parent.display(), e),
            )
        })?;
    }

    let generated = generate_id();
    fs::write(path, &generated).map_err(|e| {
        DebugError::persistence(
            "write_terminal_id",
            format!("Failed to write '{}': {}", path.display(), e),
        )
    })?;
    info!(path = %path.display(), "Created terminal id");

    Ok(read_terminal_id(path)?.unwrap_or_else(|| TerminalId::new(generated)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryWorkspaceState, StaticRegistryReader};
    use tempfile::tempdir;

    fn provider(source: TerminalIdSource) -> IdentityProvider {
        IdentityProvider::with_registry(
            Arc::new(MemoryWorkspaceState::new()),
            source,
            Arc::new(StaticRegistryReader::empty()),
        )
    }

    fn is_id(s: &str) -> bool {
        s.len() == 32
            && s
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    }

    #[test]
    fn test_generate_id_format() {
        let id = generate_id();
        assert!(is_id(&id), "unexpected id {}", id);
        assert_ne!(generate_id(), id);
    }

    #[test]
    fn test_workspace_id_is_stable() {
        let dir = tempdir().unwrap();
        let provider = provider(TerminalIdSource::File(dir.path().join("terminalId")));

        let first = provider.get_or_create_workspace_id().unwrap();
        let second = provider.get_or_create_workspace_id().unwrap();

        assert_eq!(first, second);
        assert!(is_id(first.as_str()));
    }

    #[test]
    fn test_workspace_id_reads_stored_value() {
        let state = Arc::new(MemoryWorkspaceState::new());
        state.set(WORKSPACE_ID_KEY, "STORED").unwrap();
        let provider = IdentityProvider::with_registry(
            state.clone(),
            TerminalIdSource::File("/nonexistent/terminalId".into()),
            Arc::new(StaticRegistryReader::empty()),
        );

        assert_eq!(provider.get_or_create_workspace_id().unwrap().as_str(), "STORED");
    }

    #[test]
    fn test_workspace_id_persisted_for_next_provider() {
        let state = Arc::new(MemoryWorkspaceState::new());
        let source = TerminalIdSource::File("/nonexistent/terminalId".into());
        let registry = Arc::new(StaticRegistryReader::empty());

        let first = IdentityProvider::with_registry(state.clone(), source.clone(), registry.clone())
            .get_or_create_workspace_id()
            .unwrap();
        let second = IdentityProvider::with_registry(state, source, registry)
            .get_or_create_workspace_id()
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_terminal_id_file_created_with_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".remote-debug").join("listener").join("terminalId");
        let provider = provider(TerminalIdSource::File(path.clone()));

        let id = provider.get_or_create_terminal_id().unwrap();

        assert!(is_id(id.as_str()));
        assert_eq!(fs::read_to_string(&path).unwrap(), id.as_str());
    }

    #[test]
    fn test_terminal_id_reused_across_providers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("terminalId");

        let first = provider(TerminalIdSource::File(path.clone()))
            .get_or_create_terminal_id()
            .unwrap();
        let second = provider(TerminalIdSource::File(path))
            .get_or_create_terminal_id()
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_terminal_id_trims_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("terminalId");
        fs::write(&path, "ABCDEF\n").unwrap();

        let id = provider(TerminalIdSource::File(path))
            .get_or_create_terminal_id()
            .unwrap();

        assert_eq!(id.as_str(), "ABCDEF");
    }

    #[test]
    fn test_empty_terminal_id_file_is_regenerated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("terminalId");
        fs::write(&path, "  ").unwrap();

        let id = provider(TerminalIdSource::File(path))
            .get_or_create_terminal_id()
            .unwrap();

        assert!(is_id(id.as_str()));
    }

    #[test]
    fn test_concurrent_first_creation_does_not_fail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deep").join("terminalId");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || read_or_create_terminal_id(&path))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
        assert!(read_terminal_id(&path).unwrap().is_some());
    }

    #[test]
    fn test_registry_value_is_used() {
        let provider = IdentityProvider::with_registry(
            Arc::new(MemoryWorkspaceState::new()),
            TerminalIdSource::Registry {
                key: "HKCU\\Software\\RemoteDebug\\Listener".into(),
                value: "TerminalID".into(),
            },
            Arc::new(StaticRegistryReader::with_value("REGID")),
        );

        assert_eq!(provider.get_or_create_terminal_id().unwrap().as_str(), "REGID");
    }

    #[test]
    fn test_missing_registry_value_is_unreadable() {
        let provider = provider(TerminalIdSource::Registry {
            key: "HKCU\\Software\\RemoteDebug\\Listener".into(),
            value: "TerminalID".into(),
        });

        let err = provider.get_or_create_terminal_id().unwrap_err();
        assert!(matches!(err, DebugError::RegistryUnreadable { .. }));
        assert!(err.to_string().contains("TerminalID"));
    }
}

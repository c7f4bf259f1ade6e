use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use remote_debug_common::mutex_lock_or_recover;
use tracing::warn;

use crate::error::DebugError;

/// Workspace-scoped key/value storage that outlives the process.
pub trait WorkspaceState: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), DebugError>;
}

/// Workspace state kept as a JSON object in a single file.
///
/// Writes go to a temp file that is renamed over the target, so a crash
/// never leaves a truncated state file behind.
pub struct FileWorkspaceState {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileWorkspaceState {
    /// Opens the state file, treating a missing or corrupt file as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), DebugError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DebugError::persistence(
                    "create_dir",
                    format!("Failed to create directory '{}': {}", parent.display(), e),
                )
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let file = File::create(&temp_path).map_err(|e| {
            DebugError::persistence(
                "create_temp",
                format!(
                    "Failed to create temp file '{}': {}",
                    temp_path.display(),
                    e
                ),
            )
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), entries).map_err(|e| {
            DebugError::persistence(
                "write_json",
                format!("Failed to write state to '{}': {}", temp_path.display(), e),
            )
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            DebugError::persistence(
                "rename",
                format!(
                    "Failed to rename '{}' to '{}': {}",
                    temp_path.display(),
                    self.path.display(),
                    e
                ),
            )
        })
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    if !path.exists() {
        return BTreeMap::new();
    }

    match File::open(path) {
        Ok(file) => match serde_json::from_reader(BufReader::new(file)) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Workspace state corrupted, starting empty"
                );
                BTreeMap::new()
            }
        },
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to open workspace state"
            );
            BTreeMap::new()
        }
    }
}

impl WorkspaceState for FileWorkspaceState {
    fn get(&self, key: &str) -> Option<String> {
        mutex_lock_or_recover(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DebugError> {
        let mut entries = mutex_lock_or_recover(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }
}

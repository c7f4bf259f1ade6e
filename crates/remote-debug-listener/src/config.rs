use std::env;
use std::path::PathBuf;

const DEFAULT_EVENT_CAPACITY: usize = 64;
const VENDOR_DIR: &str = ".remote-debug";
const PRODUCT_DIR: &str = "listener";
const TERMINAL_ID_FILE: &str = "terminalId";
const REGISTRY_KEY: &str = r"HKCU\Software\RemoteDebug\Listener";
const REGISTRY_VALUE: &str = "TerminalID";

/// Where the per-machine terminal id lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalIdSource {
    /// A file holding the raw identifier. Created on first use.
    File(PathBuf),
    /// A registry value written by companion tooling. Never created here.
    Registry { key: String, value: String },
}

impl TerminalIdSource {
    /// `HKCU\Software\RemoteDebug\Listener\TerminalID` on Windows,
    /// `$HOME/.remote-debug/listener/terminalId` everywhere else.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            TerminalIdSource::Registry {
                key: REGISTRY_KEY.to_string(),
                value: REGISTRY_VALUE.to_string(),
            }
        } else {
            TerminalIdSource::File(default_terminal_id_path())
        }
    }
}

fn default_terminal_id_path() -> PathBuf {
    let home = env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"));
    home.join(VENDOR_DIR).join(PRODUCT_DIR).join(TERMINAL_ID_FILE)
}

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub terminal_id_source: TerminalIdSource,
    pub event_capacity: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ListenerConfig {
    pub fn from_env() -> Self {
        Self {
            terminal_id_source: env::var("REMOTE_DEBUG_TERMINAL_ID_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| TerminalIdSource::File(PathBuf::from(v)))
                .unwrap_or_else(TerminalIdSource::platform_default),
            event_capacity: env::var("REMOTE_DEBUG_EVENT_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_EVENT_CAPACITY),
        }
    }

    pub fn with_terminal_id_source(mut self, source: TerminalIdSource) -> Self {
        self.terminal_id_source = source;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

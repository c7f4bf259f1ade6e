//! Remote debug listener.
//!
//! Owns the backend's debug listener registration for one identity tuple:
//! detects and resolves conflicting listeners, long-polls for stopped
//! debuggees, attaches to them, and reports stops and termination to the
//! debug-adapter layer.

#![deny(clippy::all)]

pub mod arbiter;
pub mod classifier;
mod config;
mod counters;
pub mod domain;
mod error;
mod identity;
mod listener;
pub mod ports;
pub mod test_support;

pub use arbiter::SessionArbiter;
pub use classifier::ConflictKind;
pub use classifier::ErrorKind;
pub use classifier::classify;
pub use classifier::is_conflict;
pub use config::ListenerConfig;
pub use config::TerminalIdSource;
pub use counters::SessionCounters;
pub use domain::*;
pub use error::CONFLICT_TEXT_PROPERTY;
pub use error::DebugError;
pub use error::ErrorCategory;
pub use error::ProtocolError;
pub use error::RemoteError;
pub use error::SUBTYPE_PROPERTY;
pub use identity::IdentityProvider;
pub use identity::WORKSPACE_ID_KEY;
pub use identity::generate_id;
pub use listener::DebugListener;
pub use listener::GuardedClient;
pub use listener::ListenerFactory;

pub type Result<T> = std::result::Result<T, DebugError>;

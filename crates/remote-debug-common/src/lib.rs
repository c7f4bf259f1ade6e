//! Shared utilities for the remote-debug crates.
//!
//! Provides tracing initialisation and poison-tolerant lock helpers.

#![deny(clippy::all)]

mod sync;
mod telemetry;

pub use sync::mutex_lock_or_recover;
pub use sync::poison_recovery_count;
pub use telemetry::TelemetryGuard;
pub use telemetry::default_directives;
pub use telemetry::init_tracing;
pub use telemetry::LOG_FILE_ENV;

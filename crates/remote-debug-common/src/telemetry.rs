use std::io::IsTerminal;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Environment variable naming a file that receives log output instead of stderr.
pub const LOG_FILE_ENV: &str = "REMOTE_DEBUG_LOG";

/// Crates whose events follow `default_level`. Everything else stays at `warn`
/// unless `RUST_LOG` says otherwise.
const LISTENER_TARGETS: &[&str] = &["remote_debug_listener", "remote_debug_common"];

/// Keeps the non-blocking log writer alive; drop it to flush.
#[derive(Debug)]
pub struct TelemetryGuard {
    _guard: Option<WorkerGuard>,
    installed: bool,
}

impl TelemetryGuard {
    fn disabled() -> Self {
        Self {
            _guard: None,
            installed: false,
        }
    }

    /// Whether this call installed the global subscriber.
    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogOutput {
    Stderr,
    File(PathBuf),
}

impl LogOutput {
    fn from_value(value: Option<String>) -> Self {
        match value {
            Some(path) if !path.trim().is_empty() => LogOutput::File(PathBuf::from(path)),
            _ => LogOutput::Stderr,
        }
    }

    fn from_env() -> Self {
        Self::from_value(std::env::var(LOG_FILE_ENV).ok())
    }

    fn make_writer(&self) -> (BoxMakeWriter, Option<WorkerGuard>) {
        let LogOutput::File(path) = self else {
            return (BoxMakeWriter::new(std::io::stderr), None);
        };
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                (BoxMakeWriter::new(non_blocking), Some(guard))
            }
            Err(err) => {
                eprintln!(
                    "Warning: failed to open log file {}: {}",
                    path.display(),
                    err
                );
                (BoxMakeWriter::new(std::io::stderr), None)
            }
        }
    }
}

/// Filter directives used when `RUST_LOG` is unset: the listener crates log at
/// `level`, dependencies at `warn`.
pub fn default_directives(level: &str) -> String {
    let mut directives = String::from("warn");
    for target in LISTENER_TARGETS {
        directives.push_str(&format!(",{}={}", target, level));
    }
    directives
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Closing an instrumented
/// lifecycle span logs its duration. When a subscriber is already installed
/// the call is a no-op and the returned guard reports `is_installed() == false`.
pub fn init_tracing(default_level: &str) -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));
    let output = LogOutput::from_env();
    let (writer, guard) = output.make_writer();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(output == LogOutput::Stderr && std::io::stderr().is_terminal())
        .with_writer(writer);

    if subscriber.try_init().is_err() {
        return TelemetryGuard::disabled();
    }

    TelemetryGuard {
        _guard: guard,
        installed: true,
    }
}

use std::process::Command;

use tracing::debug;

/// Reads string values from the machine registry.
pub trait RegistryReader: Send + Sync {
    /// Returns the value, or `None` when the key or value does not exist.
    fn read(&self, key: &str, value: &str) -> Option<String>;
}

/// Registry access through the `reg query` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegQueryReader;

impl RegistryReader for RegQueryReader {
    fn read(&self, key: &str, value: &str) -> Option<String> {
        let output = match Command::new("reg")
            .args(["query", key, "/v", value])
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                debug!(key, value, error = %e, "reg query could not be started");
                return None;
            }
        };

        if !output.status.success() {
            debug!(key, value, status = ?output.status.code(), "reg query failed");
            return None;
        }

        parse_reg_query_output(&String::from_utf8_lossy(&output.stdout), value)
    }
}

/// Extracts `value`'s data from `reg query` output.
///
/// Value lines look like `    TerminalID    REG_SZ    0A1B...`. Names are
/// matched case-insensitively, as the registry does.
pub fn parse_reg_query_output(output: &str, value: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let name = parts.next()?;
        let kind = parts.next()?;
        if !name.eq_ignore_ascii_case(value) || !kind.starts_with("REG_") {
            return None;
        }
        let data = parts.collect::<Vec<_>>().join(" ");
        (!data.is_empty()).then_some(data)
    })
}

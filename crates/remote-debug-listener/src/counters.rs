use std::collections::HashMap;
use std::sync::Mutex;

use remote_debug_common::mutex_lock_or_recover;

use crate::domain::ConnectionId;

/// Per-connection session numbering.
///
/// Owned by whatever constructs listeners and handed to them explicitly.
/// Numbers start at 1 and only grow; counters for different connections are
/// independent.
#[derive(Debug, Default)]
pub struct SessionCounters {
    counters: Mutex<HashMap<ConnectionId, u32>>,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next session number for `connection`.
    pub fn next(&self, connection: &ConnectionId) -> u32 {
        let mut counters = mutex_lock_or_recover(&self.counters);
        let counter = counters.entry(connection.clone()).or_insert(0);
        *counter = counter.saturating_add(1);
        *counter
    }

    /// Last number handed out for `connection`, 0 if none.
    pub fn current(&self, connection: &ConnectionId) -> u32 {
        mutex_lock_or_recover(&self.counters)
            .get(connection)
            .copied()
            .unwrap_or(0)
    }
}

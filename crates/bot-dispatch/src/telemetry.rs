//! Usage telemetry
//!
//! Process-wide monotonically increasing counters, shared by every worker
//! and every shard forwarder. Reset only on process restart.

use dashmap::DashMap;

/// Counter name: every message observed, bot authors included
pub const MESSAGES_READ: &str = "messages_read";
/// Counter name: every command dispatched to a handler
pub const COMMANDS_USED: &str = "commands_used";
/// Counter name: every inbound event of any kind
pub const EVENTS_RECEIVED: &str = "events_received";

/// Concurrent-increment-safe usage counters
///
/// Constructed once at process start and passed by shared ownership to all
/// dispatch workers.
#[derive(Debug, Default)]
pub struct UsageCounters {
    usage: DashMap<String, u64>,
    command_usage: DashMap<String, u64>,
}

impl UsageCounters {
    /// Create zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a named counter
    pub fn incr(&self, counter: &str) {
        *self.usage.entry(counter.to_string()).or_insert(0) += 1;
    }

    /// Read a named counter (unknown counters read as zero)
    #[must_use]
    pub fn get(&self, counter: &str) -> u64 {
        self.usage.get(counter).map_or(0, |v| *v)
    }

    /// Increment the per-command counter
    pub fn incr_command(&self, command_name: &str) {
        *self
            .command_usage
            .entry(command_name.to_string())
            .or_insert(0) += 1;
    }

    /// Read a per-command counter
    #[must_use]
    pub fn command_usage(&self, command_name: &str) -> u64 {
        self.command_usage.get(command_name).map_or(0, |v| *v)
    }

    /// Per-command counts, most used first
    #[must_use]
    pub fn command_usage_snapshot(&self) -> Vec<(String, u64)> {
        let mut snapshot: Vec<(String, u64)> = self
            .command_usage
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        snapshot.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        snapshot
    }
}

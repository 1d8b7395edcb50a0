//! Shared shard status
//!
//! Written only by the owning session task; everyone else reads.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

/// Lifecycle state of a shard session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardState {
    /// No connection; initial and terminal state
    Disconnected,
    /// Opening a fresh connection (Identify handshake)
    Connecting,
    /// Identified and receiving events
    Connected,
    /// Transient loss; reconnecting with session replay
    Resuming,
    /// Graceful shutdown in progress
    Closing,
}

impl ShardState {
    /// Whether the shard is currently able to receive events
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ShardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Resuming => "resuming",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Shared view of one shard's session
///
/// Mutated only by the shard's own lifecycle task.
#[derive(Debug)]
pub struct ShardStatus {
    shard_id: u32,
    state: RwLock<ShardState>,
    reconnect_attempts: AtomicU32,
    guild_count: AtomicU64,
    last_heartbeat: Mutex<Option<Instant>>,
    failure: Mutex<Option<String>>,
}

impl ShardStatus {
    /// Create a status record in the Disconnected state
    #[must_use]
    pub fn new(shard_id: u32) -> Self {
        Self {
            shard_id,
            state: RwLock::new(ShardState::Disconnected),
            reconnect_attempts: AtomicU32::new(0),
            guild_count: AtomicU64::new(0),
            last_heartbeat: Mutex::new(None),
            failure: Mutex::new(None),
        }
    }

    /// Shard id this status belongs to
    #[must_use]
    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ShardState {
        *self.state.read()
    }

    /// Transition to a new state
    pub fn set_state(&self, state: ShardState) {
        let previous = {
            let mut guard = self.state.write();
            std::mem::replace(&mut *guard, state)
        };

        if previous != state {
            tracing::debug!(
                shard_id = self.shard_id,
                from = %previous,
                to = %state,
                "Shard state changed"
            );
        }
    }

    /// Current reconnect attempt counter
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Increment the attempt counter, returning the new value
    pub fn record_reconnect_attempt(&self) -> u32 {
        self.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Reset the attempt counter after a stable connection
    pub fn reset_reconnect_attempts(&self) {
        self.reconnect_attempts.store(0, Ordering::SeqCst);
    }

    /// Record the guild count reported in Ready
    pub fn set_guild_count(&self, count: u64) {
        self.guild_count.store(count, Ordering::SeqCst);
    }

    /// Guild count reported by the server for this shard
    #[must_use]
    pub fn guild_count(&self) -> u64 {
        self.guild_count.load(Ordering::SeqCst)
    }

    /// Record a heartbeat acknowledgement
    pub fn record_heartbeat(&self) {
        *self.last_heartbeat.lock() = Some(Instant::now());
    }

    /// Time since the last acknowledged heartbeat
    #[must_use]
    pub fn time_since_heartbeat(&self) -> Option<std::time::Duration> {
        self.last_heartbeat.lock().map(|at| at.elapsed())
    }

    /// Mark the shard permanently failed
    pub fn mark_failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(
            shard_id = self.shard_id,
            reason = %reason,
            "Shard permanently failed"
        );
        *self.failure.lock() = Some(reason);
        self.set_state(ShardState::Disconnected);
    }

    /// Failure reason, if the shard is permanently failed
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    /// Whether the shard is permanently failed
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failure.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let status = ShardStatus::new(3);
        assert_eq!(status.shard_id(), 3);
        assert_eq!(status.state(), ShardState::Disconnected);
        assert_eq!(status.reconnect_attempts(), 0);
        assert!(!status.is_failed());
        assert!(status.time_since_heartbeat().is_none());
    }

    #[test]
    fn test_state_transitions() {
        let status = ShardStatus::new(0);
        status.set_state(ShardState::Connecting);
        status.set_state(ShardState::Connected);
        assert!(status.state().is_connected());
    }

    #[test]
    fn test_attempt_counter() {
        let status = ShardStatus::new(0);
        assert_eq!(status.record_reconnect_attempt(), 1);
        assert_eq!(status.record_reconnect_attempt(), 2);
        status.reset_reconnect_attempts();
        assert_eq!(status.reconnect_attempts(), 0);
    }

    #[test]
    fn test_mark_failed() {
        let status = ShardStatus::new(7);
        status.mark_failed("authentication failed");
        assert!(status.is_failed());
        assert_eq!(status.state(), ShardState::Disconnected);
        assert_eq!(status.failure().as_deref(), Some("authentication failed"));
    }
}

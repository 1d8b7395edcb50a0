//! Cross-instance statistics keys.
//!
//! Each running instance publishes its share of fleet-wide statistics under
//! `instance{N}-{stat}` so an external dashboard can sum across instances.
//! All writes are best-effort.

use bot_core::{CacheResult, KeyValueCache};
use std::sync::Arc;

/// A published per-instance statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceStat {
    Guilds,
    Users,
    Messages,
    Commands,
    Channels,
}

impl InstanceStat {
    /// Key segment for this statistic
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guilds => "guilds",
            Self::Users => "users",
            Self::Messages => "messages",
            Self::Commands => "commands",
            Self::Channels => "channels",
        }
    }

    /// All statistics, for publishing sweeps
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::Guilds,
            Self::Users,
            Self::Messages,
            Self::Commands,
            Self::Channels,
        ]
    }
}

impl std::fmt::Display for InstanceStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publishes per-instance statistics to the cache
#[derive(Clone)]
pub struct InstanceCounterStore {
    cache: Arc<dyn KeyValueCache>,
    instance: u32,
}

impl InstanceCounterStore {
    /// Create a store for this instance number
    #[must_use]
    pub fn new(cache: Arc<dyn KeyValueCache>, instance: u32) -> Self {
        Self { cache, instance }
    }

    fn key(&self, stat: InstanceStat) -> String {
        format!("instance{}-{}", self.instance, stat.as_str())
    }

    /// Overwrite a statistic with an absolute value
    pub async fn publish(&self, stat: InstanceStat, value: u64) -> CacheResult<()> {
        self.cache.set(&self.key(stat), &value.to_string()).await
    }

    /// Add to a statistic, returning the new value
    pub async fn add(&self, stat: InstanceStat, delta: i64) -> CacheResult<i64> {
        self.cache.incr_by(&self.key(stat), delta).await
    }

    /// Read a statistic back (absent keys read as zero)
    pub async fn read(&self, stat: InstanceStat) -> CacheResult<u64> {
        let value = self.cache.get(&self.key(stat)).await?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }
}

impl std::fmt::Debug for InstanceCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCounterStore")
            .field("instance", &self.instance)
            .finish()
    }
}

//! In-process key-value cache
//!
//! Used in debug mode (the bot runs without external stores) and in tests.
//! Same contract as the Redis-backed pool, minus durability.

use async_trait::async_trait;
use bot_core::{CacheError, CacheResult, KeyValueCache};
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory `KeyValueCache` implementation
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    /// When set, every operation fails with this error kind (test hook)
    fail_mode: Mutex<Option<FailMode>>,
}

/// Failure injection for tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    Unavailable,
    Timeout,
}

impl MemoryCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail (pass `None` to heal)
    pub fn set_fail_mode(&self, mode: Option<FailMode>) {
        *self.fail_mode.lock() = mode;
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn check_fail(&self) -> CacheResult<()> {
        match *self.fail_mode.lock() {
            Some(FailMode::Unavailable) => {
                Err(CacheError::Unavailable("injected failure".to_string()))
            }
            Some(FailMode::Timeout) => Err(CacheError::Timeout),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check_fail()?;
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.check_fail()?;
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
        self.check_fail()?;
        let mut entries = self.entries.lock();
        let current = entries
            .get(key)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + delta;
        entries.insert(key.to_string(), next.to_string());
        Ok(next)
    }
}

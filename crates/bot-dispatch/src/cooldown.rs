//! Cooldown buckets
//!
//! Fixed-window rate limiting keyed per command by the policy's bucket
//! scope. A bucket is charged at most once per invocation and never
//! double-charges; a denied invocation reports the remaining window.

use bot_core::{CommandInvocation, CooldownPolicy};
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start: Instant,
    used: u32,
}

/// Concurrent cooldown state for all commands
#[derive(Debug, Default)]
pub struct CooldownBuckets {
    buckets: DashMap<String, Bucket>,
}

impl CooldownBuckets {
    /// Create empty cooldown state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and charge the bucket for one invocation
    ///
    /// `Ok(())` charges the bucket and permits execution; `Err(remaining)`
    /// denies it without charging, reporting the time left in the window.
    pub fn check(
        &self,
        policy: &CooldownPolicy,
        invocation: &CommandInvocation,
    ) -> Result<(), Duration> {
        let now = Instant::now();
        let key = policy.bucket_key(invocation);

        let mut bucket = self.buckets.entry(key).or_insert(Bucket {
            window_start: now,
            used: 0,
        });

        let elapsed = now.duration_since(bucket.window_start);
        if elapsed >= policy.per {
            bucket.window_start = now;
            bucket.used = 0;
        }

        if bucket.used < policy.rate {
            bucket.used += 1;
            Ok(())
        } else {
            Err(policy.per.saturating_sub(elapsed))
        }
    }

    /// Number of live buckets
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no buckets are live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

//! # bot-cache
//!
//! Key-value cache layer backed by Redis.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Preferences**: Per-user prefix and language strings
//! - **Counters**: Cross-instance statistics keys
//! - **Memory cache**: In-process fallback for debug mode and tests
//!
//! The stores speak to the pool only through the `KeyValueCache` port from
//! `bot-core`, so every store also works over the in-memory implementation.

pub mod memory;
pub mod pool;
pub mod store;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export store types
pub use store::{InstanceCounterStore, InstanceStat, PreferenceStore};

// Re-export the in-memory cache
pub use memory::{FailMode, MemoryCache};

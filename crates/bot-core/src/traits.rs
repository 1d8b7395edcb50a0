//! Trait seams (ports) - capabilities the core consumes
//!
//! The domain layer defines what it needs; the infrastructure crates
//! provide the implementations (Redis cache, HTTP reply delivery) and the
//! command modules provide the handlers.

use async_trait::async_trait;

use crate::command::{CommandInvocation, Reply};
use crate::error::CommandError;
use crate::ids::Snowflake;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Failure talking to the external key-value store
///
/// Callers on the dispatch path must treat every variant as degradable:
/// a cache failure never propagates to the invoker.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache operation timed out")]
    Timeout,
}

/// Async interface to the external key-value store
///
/// Keys in use: `"{user_id}-prefix"`, `"{user_id}-lang"`,
/// `"instance{N}-{guilds|users|messages|commands|channels}"`.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Read a key, `None` when absent
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Write a key
    async fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Atomically add `delta` to a numeric key, returning the new value
    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64>;
}

/// A registered command's executable side
///
/// Handlers are assumed independent; one requiring exclusivity declares it
/// on its descriptor instead of locking internally.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Execute the command, producing zero or one reply
    async fn invoke(&self, invocation: &CommandInvocation) -> Result<Option<Reply>, CommandError>;
}

/// Result type for reply delivery
pub type SinkResult = Result<(), SinkError>;

/// Failure delivering an outbound reply
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("reply delivery failed: {0}")]
    Delivery(String),
}

/// Outbound message delivery - the "send message" capability
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Deliver a reply to a channel
    async fn send(&self, channel_id: Snowflake, reply: Reply) -> SinkResult;
}

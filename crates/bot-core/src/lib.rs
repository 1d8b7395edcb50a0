//! # bot-core
//!
//! Domain layer for the bot gateway client: inbound events, command
//! invocations, command metadata, and the trait seams the infrastructure
//! crates implement. This crate has zero dependencies on infrastructure
//! (Redis, WebSocket, HTTP).

pub mod command;
pub mod error;
pub mod event;
pub mod ids;
pub mod traits;

// Re-export commonly used types at crate root
pub use command::{
    BucketKind, CommandDescriptor, CommandInvocation, CooldownPolicy, Guard, GuardDenial, Reply,
};
pub use error::CommandError;
pub use event::{EventKind, EventPayload, InboundEvent, MessagePayload, PresencePayload};
pub use ids::{Snowflake, SnowflakeParseError};
pub use traits::{
    CacheError, CacheResult, CommandHandler, KeyValueCache, ReplySink, SinkError, SinkResult,
};

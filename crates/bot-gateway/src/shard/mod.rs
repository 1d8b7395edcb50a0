//! Shard session lifecycle
//!
//! One `ShardSession` task owns one gateway connection; its `ShardStatus`
//! is the shared read-only view the manager and operator surfaces use.

mod session;
mod status;

pub use session::{ShardSession, ShardSessionConfig};
pub use status::{ShardState, ShardStatus};

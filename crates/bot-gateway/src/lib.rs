//! # bot-gateway
//!
//! Sharded gateway sessions for the bot client.
//!
//! ## Features
//!
//! - **Protocol**: opcodes, frames, close codes, handshake payloads
//! - **Transport**: `GatewayTransport`/`GatewayConnector` seams with a
//!   WebSocket implementation and an in-process loopback for tests
//! - **Shard sessions**: per-shard lifecycle task with heartbeat, resume,
//!   and capped exponential backoff
//! - **Manager**: staggered fleet launch and bounded-order shutdown
//!
//! Events flow out through a single merged channel: each session
//! normalizes dispatch frames into `bot_core::InboundEvent` values.

pub mod backoff;
pub mod manager;
pub mod protocol;
pub mod shard;
pub mod transport;

// Re-export the main lifecycle types
pub use backoff::ReconnectBackoff;
pub use manager::{ShardManager, ShardManagerConfig};
pub use protocol::{CloseCode, Frame, HelloPayload, IdentifyPayload, OpCode, ReadyPayload, ResumePayload};
pub use shard::{ShardSession, ShardSessionConfig, ShardState, ShardStatus};
pub use transport::{
    ChannelConnector, ChannelTransport, GatewayConnector, GatewayTransport, PeerHandle,
    TransportError, TransportResult, WsConnector,
};

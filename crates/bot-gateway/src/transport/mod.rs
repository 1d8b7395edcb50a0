//! Gateway transport abstraction
//!
//! The shard sessions drive the gateway through these traits; the wire
//! protocol of any specific platform stays behind them. `WsConnector`
//! speaks JSON frames over WebSocket; `ChannelConnector` is an in-process
//! loopback used by tests.

mod channel;
mod ws;

pub use channel::{ChannelConnector, ChannelTransport, PeerHandle};
pub use ws::WsConnector;

use crate::protocol::Frame;
use async_trait::async_trait;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Failure at the transport layer
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection closed (code {code:?}): {reason}")]
    Closed {
        /// Close code from the peer, when one was delivered
        code: Option<u16>,
        reason: String,
    },

    #[error("transport i/o error: {0}")]
    Io(String),

    #[error("invalid frame: {0}")]
    Decode(String),
}

impl TransportError {
    /// A plain close with no code
    #[must_use]
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::Closed {
            code: None,
            reason: reason.into(),
        }
    }

    /// The close code delivered by the peer, if any
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Self::Closed { code, .. } => *code,
            _ => None,
        }
    }
}

/// One open gateway connection, owned exclusively by a shard session
#[async_trait]
pub trait GatewayTransport: Send {
    /// Receive the next frame; suspends until one arrives or the
    /// connection drops
    async fn receive(&mut self) -> TransportResult<Frame>;

    /// Send a frame
    async fn send(&mut self, frame: Frame) -> TransportResult<()>;

    /// Close the connection gracefully
    async fn close(&mut self) -> TransportResult<()>;
}

/// Opens gateway connections for shards
#[async_trait]
pub trait GatewayConnector: Send + Sync {
    /// Open a connection for one shard of the fleet
    async fn open(
        &self,
        shard_id: u32,
        shard_count: u32,
    ) -> TransportResult<Box<dyn GatewayTransport>>;
}

//! WebSocket gateway transport
//!
//! JSON frames over tokio-tungstenite. Pings are answered by the library;
//! this layer only surfaces text frames and close frames.

use super::{GatewayConnector, GatewayTransport, TransportError, TransportResult};
use crate::protocol::Frame;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Connects shards to a WebSocket gateway URL
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Create a connector for the given gateway URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl GatewayConnector for WsConnector {
    async fn open(
        &self,
        shard_id: u32,
        shard_count: u32,
    ) -> TransportResult<Box<dyn GatewayTransport>> {
        let (stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(
            shard_id = shard_id,
            shard_count = shard_count,
            "Gateway WebSocket connected"
        );

        Ok(Box::new(WsTransport { stream }))
    }
}

/// One open WebSocket gateway connection
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl GatewayTransport for WsTransport {
    async fn receive(&mut self) -> TransportResult<Frame> {
        loop {
            let message = self
                .stream
                .next()
                .await
                .ok_or_else(|| TransportError::closed("stream ended"))?
                .map_err(|e| TransportError::Io(e.to_string()))?;

            match message {
                Message::Text(text) => {
                    return Frame::from_json(&text)
                        .map_err(|e| TransportError::Decode(e.to_string()));
                }
                Message::Close(close_frame) => {
                    let (code, reason) = close_frame
                        .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                        .unwrap_or((None, "closed without code".to_string()));
                    return Err(TransportError::Closed { code, reason });
                }
                // Control frames are handled by tungstenite; skip the rest
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn send(&mut self, frame: Frame) -> TransportResult<()> {
        let json = frame
            .to_json()
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        self.stream
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.stream
            .close(None)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport").finish()
    }
}

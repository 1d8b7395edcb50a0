//! In-process loopback transport
//!
//! Each `open` call produces a connected pair: the shard side implements
//! `GatewayTransport`, and a `PeerHandle` is announced so a test (or a
//! local harness) can play the server role frame by frame.

use super::{GatewayConnector, GatewayTransport, TransportError, TransportResult};
use crate::protocol::Frame;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Server-side handle of one opened loopback connection
#[derive(Debug)]
pub struct PeerHandle {
    /// Shard id the client opened with
    pub shard_id: u32,
    /// Total shard count the client opened with
    pub shard_count: u32,
    /// Frames pushed here arrive at the shard's `receive`
    pub to_client: mpsc::UnboundedSender<Frame>,
    /// Frames the shard `send`s land here
    pub from_client: mpsc::UnboundedReceiver<Frame>,
}

/// Connector that hands out loopback connections
#[derive(Debug)]
pub struct ChannelConnector {
    accept_tx: mpsc::UnboundedSender<PeerHandle>,
    refuse: Arc<AtomicBool>,
}

impl ChannelConnector {
    /// Create a connector and the receiver on which new connections are
    /// announced
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PeerHandle>) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        (
            Self {
                accept_tx,
                refuse: Arc::new(AtomicBool::new(false)),
            },
            accept_rx,
        )
    }

    /// Make subsequent `open` calls fail (simulates the gateway being down)
    pub fn set_refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

#[async_trait]
impl GatewayConnector for ChannelConnector {
    async fn open(
        &self,
        shard_id: u32,
        shard_count: u32,
    ) -> TransportResult<Box<dyn GatewayTransport>> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (to_client, client_rx) = mpsc::unbounded_channel();
        let (client_tx, from_client) = mpsc::unbounded_channel();

        self.accept_tx
            .send(PeerHandle {
                shard_id,
                shard_count,
                to_client,
                from_client,
            })
            .map_err(|_| TransportError::Connect("acceptor dropped".to_string()))?;

        Ok(Box::new(ChannelTransport {
            rx: client_rx,
            tx: Some(client_tx),
        }))
    }
}

/// Shard side of a loopback connection
#[derive(Debug)]
pub struct ChannelTransport {
    rx: mpsc::UnboundedReceiver<Frame>,
    tx: Option<mpsc::UnboundedSender<Frame>>,
}

#[async_trait]
impl GatewayTransport for ChannelTransport {
    async fn receive(&mut self) -> TransportResult<Frame> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| TransportError::closed("peer hung up"))
    }

    async fn send(&mut self, frame: Frame) -> TransportResult<()> {
        match &self.tx {
            Some(tx) => tx
                .send(frame)
                .map_err(|_| TransportError::closed("peer hung up")),
            None => Err(TransportError::closed("transport closed")),
        }
    }

    async fn close(&mut self) -> TransportResult<()> {
        // Dropping the sender lets the peer observe the close
        self.tx = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::OpCode;

    #[tokio::test]
    async fn test_loopback_roundtrip() {
        let (connector, mut accept_rx) = ChannelConnector::new();
        let mut transport = connector.open(1, 4).await.unwrap();

        let mut peer = accept_rx.recv().await.unwrap();
        assert_eq!(peer.shard_id, 1);
        assert_eq!(peer.shard_count, 4);

        peer.to_client.send(Frame::heartbeat(Some(7))).unwrap();
        let frame = transport.receive().await.unwrap();
        assert_eq!(frame.op, OpCode::Heartbeat);

        transport.send(Frame::heartbeat(None)).await.unwrap();
        let echoed = peer.from_client.recv().await.unwrap();
        assert_eq!(echoed.op, OpCode::Heartbeat);
    }

    #[tokio::test]
    async fn test_receive_after_peer_drop_is_closed() {
        let (connector, mut accept_rx) = ChannelConnector::new();
        let mut transport = connector.open(0, 1).await.unwrap();

        let peer = accept_rx.recv().await.unwrap();
        drop(peer);

        let err = transport.receive().await.unwrap_err();
        assert!(matches!(err, TransportError::Closed { .. }));
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let (connector, _accept_rx) = ChannelConnector::new();
        connector.set_refuse_connections(true);

        let err = connector.open(0, 1).await.err().unwrap();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}

//! Shard session manager
//!
//! Launches one independent session task per shard id, staggered to
//! respect the platform's identify rate limit, and shuts the fleet down
//! in bounded order: cooperative signal, drain with timeout, force-close
//! stragglers.

use crate::shard::{ShardSession, ShardSessionConfig, ShardStatus};
use crate::transport::GatewayConnector;
use bot_common::ReconnectConfig;
use bot_core::InboundEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Manager configuration
#[derive(Debug, Clone)]
pub struct ShardManagerConfig {
    /// Authentication token shared by all shards
    pub token: String,
    /// Total shard count the fleet identifies with
    pub shard_count: u32,
    /// Stagger between consecutive shard launches
    pub identify_delay: Duration,
    /// Reconnect/backoff settings
    pub reconnect: ReconnectConfig,
    /// How long `stop` waits before force-closing a shard
    pub shutdown_timeout: Duration,
    /// Bound on each shard's Hello/Ready handshake
    pub handshake_timeout: Duration,
    /// Capacity of the merged event channel
    pub event_buffer: usize,
}

impl ShardManagerConfig {
    /// Configuration with defaults for everything but token and count
    #[must_use]
    pub fn new(token: impl Into<String>, shard_count: u32) -> Self {
        Self {
            token: token.into(),
            shard_count,
            identify_delay: Duration::from_secs(5),
            reconnect: ReconnectConfig::default(),
            shutdown_timeout: Duration::from_secs(10),
            handshake_timeout: ShardSessionConfig::DEFAULT_HANDSHAKE_TIMEOUT,
            event_buffer: 1024,
        }
    }
}

struct ShardTask {
    shard_id: u32,
    handle: JoinHandle<()>,
}

/// Owns the lifecycle of every shard session
pub struct ShardManager {
    config: ShardManagerConfig,
    connector: Arc<dyn GatewayConnector>,
    events_tx: mpsc::Sender<InboundEvent>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<ShardTask>,
    statuses: Vec<Arc<ShardStatus>>,
}

impl ShardManager {
    /// Create a manager and the receiver carrying events from all shards
    #[must_use]
    pub fn new(
        config: ShardManagerConfig,
        connector: Arc<dyn GatewayConnector>,
    ) -> (Self, mpsc::Receiver<InboundEvent>) {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer);
        let (shutdown_tx, _) = watch::channel(false);

        (
            Self {
                config,
                connector,
                events_tx,
                shutdown_tx,
                tasks: Vec::new(),
                statuses: Vec::new(),
            },
            events_rx,
        )
    }

    /// Launch one session task per shard id
    ///
    /// Launches are staggered by the identify delay. A shard id that is
    /// already running is skipped: at most one active connection per shard.
    pub fn start(&mut self, shard_ids: &[u32]) {
        for (index, &shard_id) in shard_ids.iter().enumerate() {
            if self.statuses.iter().any(|s| s.shard_id() == shard_id) {
                tracing::warn!(shard_id = shard_id, "Shard already running, skipping");
                continue;
            }

            let status = Arc::new(ShardStatus::new(shard_id));
            let session = ShardSession::new(
                shard_id,
                ShardSessionConfig {
                    token: self.config.token.clone(),
                    shard_count: self.config.shard_count,
                    start_delay: self.config.identify_delay * index as u32,
                    reconnect: self.config.reconnect,
                    handshake_timeout: self.config.handshake_timeout,
                },
                Arc::clone(&self.connector),
                self.events_tx.clone(),
                Arc::clone(&status),
                self.shutdown_tx.subscribe(),
            );

            let handle = tokio::spawn(session.run());
            self.tasks.push(ShardTask { shard_id, handle });
            self.statuses.push(status);
        }

        tracing::info!(
            shards = self.tasks.len(),
            total_shards = self.config.shard_count,
            "Shard manager started"
        );
    }

    /// Signal all sessions to close and wait for them to drain
    ///
    /// Sessions still running after the shutdown timeout are force-closed.
    pub async fn stop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }

        let _ = self.shutdown_tx.send(true);

        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout;
        for mut task in self.tasks.drain(..) {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, &mut task.handle).await {
                Ok(_) => {
                    tracing::debug!(shard_id = task.shard_id, "Shard drained");
                }
                Err(_) => {
                    tracing::warn!(
                        shard_id = task.shard_id,
                        "Shard did not drain in time, force-closing"
                    );
                    task.handle.abort();
                }
            }
        }

        tracing::info!("Shard manager stopped");
    }

    /// Status records of all launched shards
    #[must_use]
    pub fn statuses(&self) -> &[Arc<ShardStatus>] {
        &self.statuses
    }

    /// Status of a single shard
    #[must_use]
    pub fn status(&self, shard_id: u32) -> Option<&Arc<ShardStatus>> {
        self.statuses.iter().find(|s| s.shard_id() == shard_id)
    }

    /// Number of shards currently connected
    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| s.state().is_connected())
            .count()
    }

    /// Whether every launched shard has permanently failed
    ///
    /// This is the only shard condition that is process-fatal.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.statuses.is_empty() && self.statuses.iter().all(|s| s.is_failed())
    }

    /// Sum of guild counts reported by all shards
    #[must_use]
    pub fn total_guild_count(&self) -> u64 {
        self.statuses.iter().map(|s| s.guild_count()).sum()
    }
}

impl std::fmt::Debug for ShardManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardManager")
            .field("shards", &self.tasks.len())
            .field("total_shards", &self.config.shard_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Frame, OpCode};
    use crate::shard::ShardState;
    use crate::transport::{ChannelConnector, PeerHandle};
    use serde_json::json;

    fn test_config() -> ShardManagerConfig {
        ShardManagerConfig {
            identify_delay: Duration::ZERO,
            reconnect: ReconnectConfig {
                base_delay_ms: 1,
                max_delay_ms: 5,
                max_attempts: 3,
                stability_window_secs: 3600,
            },
            shutdown_timeout: Duration::from_secs(1),
            handshake_timeout: Duration::from_secs(1),
            ..ShardManagerConfig::new("test-token", 1)
        }
    }

    fn hello() -> Frame {
        Frame {
            op: OpCode::Hello,
            t: None,
            s: None,
            d: Some(json!({"heartbeat_interval": 45_000})),
        }
    }

    fn ready(session_id: &str) -> Frame {
        Frame {
            op: OpCode::Dispatch,
            t: Some("READY".to_string()),
            s: Some(0),
            d: Some(json!({"session_id": session_id, "guild_count": 2})),
        }
    }

    fn message(seq: u64, content: &str) -> Frame {
        Frame {
            op: OpCode::Dispatch,
            t: Some("MESSAGE_CREATE".to_string()),
            s: Some(seq),
            d: Some(json!({
                "id": "1",
                "author_id": "123",
                "channel_id": "456",
                "content": content,
            })),
        }
    }

    /// Drive the Hello/Identify/Ready handshake from the server side
    async fn complete_handshake(peer: &mut PeerHandle, session_id: &str) {
        peer.to_client.send(hello()).unwrap();
        let identify = peer.from_client.recv().await.unwrap();
        assert_eq!(identify.op, OpCode::Identify);
        peer.to_client.send(ready(session_id)).unwrap();
    }

    #[tokio::test]
    async fn test_start_connects_and_forwards_events() {
        let (connector, mut accept) = ChannelConnector::new();
        let (mut manager, mut events) = ShardManager::new(test_config(), Arc::new(connector));

        manager.start(&[0]);

        let mut peer = accept.recv().await.unwrap();
        assert_eq!(peer.shard_id, 0);
        complete_handshake(&mut peer, "sess-1").await;

        peer.to_client.send(message(1, "hello world")).unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(event.shard_id, 0);
        assert_eq!(event.kind(), bot_core::EventKind::Message);

        // Connected state and ready metadata are visible through the status
        let status = manager.status(0).unwrap();
        assert!(status.state().is_connected());
        assert_eq!(status.guild_count(), 2);
        assert_eq!(manager.total_guild_count(), 2);

        manager.stop().await;
        assert_eq!(manager.status(0).unwrap().state(), ShardState::Disconnected);
    }

    #[tokio::test]
    async fn test_duplicate_shard_id_not_restarted() {
        let (connector, mut accept) = ChannelConnector::new();
        let (mut manager, _events) = ShardManager::new(test_config(), Arc::new(connector));

        manager.start(&[0]);
        manager.start(&[0]);

        let _peer = accept.recv().await.unwrap();
        assert_eq!(manager.statuses().len(), 1);

        manager.stop().await;
    }

    #[tokio::test]
    async fn test_reconnect_request_resumes_session() {
        let (connector, mut accept) = ChannelConnector::new();
        let (mut manager, _events) = ShardManager::new(test_config(), Arc::new(connector));

        manager.start(&[0]);

        let mut peer = accept.recv().await.unwrap();
        complete_handshake(&mut peer, "sess-1").await;
        peer.to_client.send(message(5, "before drop")).unwrap();

        // Ask the client to reconnect; it should come back with a Resume
        peer.to_client
            .send(Frame {
                op: OpCode::Reconnect,
                t: None,
                s: None,
                d: None,
            })
            .unwrap();

        let mut peer2 = accept.recv().await.unwrap();
        peer2.to_client.send(hello()).unwrap();

        let resume = peer2.from_client.recv().await.unwrap();
        assert_eq!(resume.op, OpCode::Resume);
        let d = resume.d.unwrap();
        assert_eq!(d["session_id"], "sess-1");
        assert_eq!(d["seq"], 5);

        manager.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_session_forces_reidentify() {
        let (connector, mut accept) = ChannelConnector::new();
        let (mut manager, _events) = ShardManager::new(test_config(), Arc::new(connector));

        manager.start(&[0]);

        let mut peer = accept.recv().await.unwrap();
        complete_handshake(&mut peer, "sess-1").await;

        // Not resumable: the client must identify from scratch
        peer.to_client
            .send(Frame {
                op: OpCode::InvalidSession,
                t: None,
                s: None,
                d: Some(json!(false)),
            })
            .unwrap();

        let mut peer2 = accept.recv().await.unwrap();
        peer2.to_client.send(hello()).unwrap();

        let second = peer2.from_client.recv().await.unwrap();
        assert_eq!(second.op, OpCode::Identify);

        manager.stop().await;
    }

    #[tokio::test]
    async fn test_attempt_ceiling_surfaces_permanent_failure() {
        let (connector, _accept) = ChannelConnector::new();
        connector.set_refuse_connections(true);
        let (mut manager, _events) = ShardManager::new(test_config(), Arc::new(connector));

        manager.start(&[0]);

        // base 1ms / cap 5ms / 3 attempts: failure lands well within a second
        let status = Arc::clone(manager.status(0).unwrap());
        tokio::time::timeout(Duration::from_secs(2), async {
            while !status.is_failed() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("shard never marked failed");

        assert!(manager.all_failed());
        assert!(status.failure().unwrap().contains("exhausted"));

        manager.stop().await;
    }
}

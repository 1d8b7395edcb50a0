//! Shared fixtures for the end-to-end tests
//!
//! Runs the whole bot over the in-process loopback transport and an
//! in-memory cache, with a recording sink standing in for reply delivery.

use async_trait::async_trait;
use bot_common::{
    AppSettings, BotConfig, DispatchConfig, GatewayConfig, ReconnectConfig, ReportingConfig,
};
use bot_core::{Reply, ReplySink, SinkResult, Snowflake};
use bot_gateway::{Frame, OpCode, PeerHandle};
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;

/// Captures every reply the bot delivers
#[derive(Debug, Default)]
pub struct RecordingSink {
    replies: Mutex<Vec<(Snowflake, Reply)>>,
}

impl RecordingSink {
    pub fn replies(&self) -> Vec<(Snowflake, Reply)> {
        self.replies.lock().unwrap().clone()
    }

    /// Wait until at least `count` replies were delivered
    pub async fn wait_for(&self, count: usize) -> Vec<(Snowflake, Reply)> {
        tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                let replies = self.replies();
                if replies.len() >= count {
                    return replies;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for replies")
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send(&self, channel_id: Snowflake, reply: Reply) -> SinkResult {
        self.replies.lock().unwrap().push((channel_id, reply));
        Ok(())
    }
}

/// Configuration tuned for fast tests: one shard, no stagger, tight
/// timeouts
pub fn test_config() -> BotConfig {
    BotConfig {
        app: AppSettings {
            name: "bot-client-test".to_string(),
            debug: false,
            instance: 0,
            owner_id: Some(1),
        },
        gateway: GatewayConfig {
            url: "loopback".to_string(),
            token: "test-token".to_string(),
            shard_count: 1,
            shard_ids: None,
            identify_delay_ms: 0,
            bot_user_id: 999,
        },
        reconnect: ReconnectConfig {
            base_delay_ms: 1,
            max_delay_ms: 10,
            max_attempts: 3,
            stability_window_secs: 3600,
        },
        dispatch: DispatchConfig {
            workers: 2,
            queue_depth: 64,
            grace_timeout_secs: 1,
            shutdown_timeout_secs: 2,
        },
        reporting: ReportingConfig {
            webhook_url: None,
            rest_url: None,
        },
        redis: None,
    }
}

/// Server-side Hello frame
pub fn hello() -> Frame {
    Frame {
        op: OpCode::Hello,
        t: None,
        s: None,
        d: Some(json!({"heartbeat_interval": 45_000})),
    }
}

/// Server-side Ready dispatch
pub fn ready(session_id: &str, guild_count: u64) -> Frame {
    Frame {
        op: OpCode::Dispatch,
        t: Some("READY".to_string()),
        s: Some(0),
        d: Some(json!({"session_id": session_id, "guild_count": guild_count})),
    }
}

/// Server-side message dispatch
pub fn message(seq: u64, author: i64, content: &str) -> Frame {
    message_in(seq, author, content, None, false)
}

/// Server-side message dispatch with full control
pub fn message_in(
    seq: u64,
    author: i64,
    content: &str,
    guild_id: Option<i64>,
    author_is_bot: bool,
) -> Frame {
    Frame {
        op: OpCode::Dispatch,
        t: Some("MESSAGE_CREATE".to_string()),
        s: Some(seq),
        d: Some(json!({
            "id": seq.to_string(),
            "author_id": author.to_string(),
            "author_is_bot": author_is_bot,
            "channel_id": "456",
            "guild_id": guild_id.map(|id| id.to_string()),
            "content": content,
        })),
    }
}

/// Drive the server side of the Identify handshake
pub async fn complete_handshake(peer: &mut PeerHandle, session_id: &str) {
    peer.to_client.send(hello()).unwrap();
    let identify = peer
        .from_client
        .recv()
        .await
        .expect("client never sent identify");
    assert_eq!(identify.op, OpCode::Identify);
    peer.to_client.send(ready(session_id, 1)).unwrap();
}

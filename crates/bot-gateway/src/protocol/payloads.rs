//! Gateway payload definitions
//!
//! Payload structures for the handshake: Hello from the server, Identify
//! and Resume from the client, Ready dispatched back after Identify.

use bot_core::Snowflake;
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Heartbeat interval assumed when the server omits one (45 seconds)
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 45_000;

    /// Create a Hello payload with custom interval
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self {
            heartbeat_interval: Self::DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// Payload for op 2 (Identify)
///
/// Sent by the client to authenticate a new shard session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Authentication token
    pub token: String,

    /// `[shard_id, total_shard_count]` pair
    pub shard: [u32; 2],

    /// Optional client properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IdentifyProperties>,
}

impl IdentifyPayload {
    /// Identify for one shard of a fleet
    #[must_use]
    pub fn new(token: impl Into<String>, shard_id: u32, shard_count: u32) -> Self {
        Self {
            token: token.into(),
            shard: [shard_id, shard_count],
            properties: Some(IdentifyProperties::default()),
        }
    }
}

/// Client connection properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyProperties {
    /// Operating system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,

    /// Client library name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,

    /// Device type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: Some(std::env::consts::OS.to_string()),
            browser: Some("bot-gateway".to_string()),
            device: Some("bot-gateway".to_string()),
        }
    }
}

/// Payload of the `READY` dispatch
///
/// Received once after a successful Identify; carries the session id used
/// for later Resume attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyPayload {
    /// Session ID assigned by the server
    pub session_id: String,

    /// The bot's own user id
    #[serde(default)]
    pub user_id: Option<Snowflake>,

    /// Number of guilds on this shard
    #[serde(default)]
    pub guild_count: Option<u64>,
}

/// Payload for op 4 (Resume)
///
/// Sent by the client to resume a disconnected session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    /// Authentication token
    pub token: String,

    /// Session ID to resume
    pub session_id: String,

    /// Last received sequence number
    pub seq: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_defaults() {
        let hello = HelloPayload::default();
        assert_eq!(hello.heartbeat_interval, 45_000);

        let custom = HelloPayload::with_interval(30_000);
        assert_eq!(custom.heartbeat_interval, 30_000);
    }

    #[test]
    fn test_identify_shard_pair() {
        let payload = IdentifyPayload::new("token123", 3, 8);
        assert_eq!(payload.shard, [3, 8]);

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("[3,8]"));
        assert!(json.contains("token123"));
    }

    #[test]
    fn test_ready_payload_minimal() {
        let ready: ReadyPayload = serde_json::from_str(r#"{"session_id": "abc"}"#).unwrap();
        assert_eq!(ready.session_id, "abc");
        assert!(ready.user_id.is_none());
        assert!(ready.guild_count.is_none());
    }

    #[test]
    fn test_resume_payload_serialization() {
        let payload = ResumePayload {
            token: "token123".to_string(),
            session_id: "session456".to_string(),
            seq: 42,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("session456"));
        assert!(json.contains("42"));
    }
}

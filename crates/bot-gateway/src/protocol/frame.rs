//! Gateway frame format
//!
//! All messages exchanged over the gateway connection follow this format.
//! Constructors cover the frames the client sends; accessors parse the
//! frames it receives.

use super::{HelloPayload, IdentifyPayload, OpCode, ReadyPayload, ResumePayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single gateway frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl Frame {
    // === Frames the client sends ===

    /// Create a Heartbeat frame (op=1) carrying the last received sequence
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self {
            op: OpCode::Heartbeat,
            t: None,
            s: None,
            d: last_sequence.map(|s| Value::Number(s.into())),
        }
    }

    /// Create an Identify frame (op=2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self {
            op: OpCode::Identify,
            t: None,
            s: None,
            d: serde_json::to_value(payload).ok(),
        }
    }

    /// Create a Resume frame (op=4)
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self {
            op: OpCode::Resume,
            t: None,
            s: None,
            d: serde_json::to_value(payload).ok(),
        }
    }

    /// Create a Presence Update frame (op=3)
    #[must_use]
    pub fn presence_update(status: impl Into<String>) -> Self {
        Self {
            op: OpCode::PresenceUpdate,
            t: None,
            s: None,
            d: Some(serde_json::json!({ "status": status.into() })),
        }
    }

    // === Parsing frames the client receives ===

    /// Try to parse as a Hello payload (op=10)
    #[must_use]
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse as a Ready dispatch (op=0, t=READY)
    #[must_use]
    pub fn as_ready(&self) -> Option<ReadyPayload> {
        if self.op != OpCode::Dispatch || self.t.as_deref() != Some("READY") {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// For an Invalid Session frame (op=7), whether the session is resumable
    #[must_use]
    pub fn invalid_session_resumable(&self) -> Option<bool> {
        if self.op != OpCode::InvalidSession {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    /// Whether this is a dispatch frame
    #[must_use]
    pub fn is_dispatch(&self) -> bool {
        self.op == OpCode::Dispatch
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "Frame(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "Frame(op={})", self.op)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_frame() {
        let frame = Frame::heartbeat(Some(41));
        assert_eq!(frame.op, OpCode::Heartbeat);
        assert_eq!(frame.d, Some(Value::Number(41.into())));

        let empty = Frame::heartbeat(None);
        assert!(empty.d.is_none());
    }

    #[test]
    fn test_identify_frame_roundtrip() {
        let frame = Frame::identify(&IdentifyPayload::new("tok", 0, 2));
        let json = frame.to_json().unwrap();
        let parsed = Frame::from_json(&json).unwrap();

        assert_eq!(parsed.op, OpCode::Identify);
        assert!(json.contains("[0,2]"));
    }

    #[test]
    fn test_parse_hello() {
        let frame = Frame {
            op: OpCode::Hello,
            t: None,
            s: None,
            d: Some(serde_json::json!({"heartbeat_interval": 45000})),
        };

        let hello = frame.as_hello().unwrap();
        assert_eq!(hello.heartbeat_interval, 45_000);

        // Non-hello frames parse to None
        assert!(Frame::heartbeat(None).as_hello().is_none());
    }

    #[test]
    fn test_parse_ready() {
        let frame = Frame {
            op: OpCode::Dispatch,
            t: Some("READY".to_string()),
            s: Some(1),
            d: Some(serde_json::json!({"session_id": "sess-1"})),
        };

        let ready = frame.as_ready().unwrap();
        assert_eq!(ready.session_id, "sess-1");

        // Other dispatches are not READY
        let other = Frame {
            t: Some("MESSAGE_CREATE".to_string()),
            ..frame
        };
        assert!(other.as_ready().is_none());
    }

    #[test]
    fn test_invalid_session_resumable() {
        let frame = Frame {
            op: OpCode::InvalidSession,
            t: None,
            s: None,
            d: Some(Value::Bool(true)),
        };
        assert_eq!(frame.invalid_session_resumable(), Some(true));

        // Missing payload means not resumable
        let bare = Frame {
            op: OpCode::InvalidSession,
            t: None,
            s: None,
            d: None,
        };
        assert_eq!(bare.invalid_session_resumable(), Some(false));
    }

    #[test]
    fn test_frame_display() {
        let frame = Frame {
            op: OpCode::Dispatch,
            t: Some("MESSAGE_CREATE".to_string()),
            s: Some(5),
            d: None,
        };
        let display = format!("{frame}");
        assert!(display.contains("MESSAGE_CREATE"));
        assert!(display.contains("s=5"));
    }
}

//! Inbound gateway events
//!
//! Raw dispatch frames from the gateway are normalized into `InboundEvent`
//! values at the shard boundary and consumed exactly once by the dispatch
//! pipeline. Event kinds the pipeline does not understand are carried as
//! `Other` so telemetry still sees them.

use crate::ids::Snowflake;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse classification of an inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A chat message was created
    Message,
    /// A user's presence changed
    PresenceChange,
    /// Any other dispatch event (guild sync, typing, ...)
    Other,
}

/// Payload of a `MESSAGE_CREATE` dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Message ID
    pub id: Snowflake,
    /// Author's user ID
    pub author_id: Snowflake,
    /// Whether the author is a bot account
    #[serde(default)]
    pub author_is_bot: bool,
    /// Channel the message was posted in
    pub channel_id: Snowflake,
    /// Guild the channel belongs to (None in direct messages)
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Raw message text
    pub content: String,
}

/// Payload of a `PRESENCE_UPDATE` dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresencePayload {
    /// User whose presence changed
    pub user_id: Snowflake,
    /// Guild the presence applies to (None for global presence)
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// New status string ("online", "idle", ...)
    pub status: String,
}

/// Normalized event payload, tagged by kind
#[derive(Debug, Clone)]
pub enum EventPayload {
    Message(MessagePayload),
    Presence(PresencePayload),
    /// Unrecognized dispatch, kept for telemetry and future handlers
    Other {
        event_type: String,
        data: Value,
    },
}

/// A single event received from one shard
///
/// Immutable once constructed; produced by a shard session and consumed
/// exactly once by the dispatch pipeline.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Shard the event arrived on
    pub shard_id: u32,
    /// Normalized payload
    pub payload: EventPayload,
}

impl InboundEvent {
    /// Normalize a raw dispatch frame into an event
    ///
    /// Payloads that fail to parse for a known event type are demoted to
    /// `Other` rather than dropped, so a malformed frame never silently
    /// disappears from telemetry.
    #[must_use]
    pub fn from_dispatch(shard_id: u32, event_type: &str, data: Value) -> Self {
        let payload = match event_type {
            "MESSAGE_CREATE" => match serde_json::from_value::<MessagePayload>(data.clone()) {
                Ok(msg) => EventPayload::Message(msg),
                Err(_) => EventPayload::Other {
                    event_type: event_type.to_string(),
                    data,
                },
            },
            "PRESENCE_UPDATE" => match serde_json::from_value::<PresencePayload>(data.clone()) {
                Ok(presence) => EventPayload::Presence(presence),
                Err(_) => EventPayload::Other {
                    event_type: event_type.to_string(),
                    data,
                },
            },
            _ => EventPayload::Other {
                event_type: event_type.to_string(),
                data,
            },
        };

        Self { shard_id, payload }
    }

    /// Construct a message event directly (used by tests and fixtures)
    #[must_use]
    pub fn message(shard_id: u32, payload: MessagePayload) -> Self {
        Self {
            shard_id,
            payload: EventPayload::Message(payload),
        }
    }

    /// Coarse kind of this event
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::Message(_) => EventKind::Message,
            EventPayload::Presence(_) => EventKind::PresenceChange,
            EventPayload::Other { .. } => EventKind::Other,
        }
    }
}

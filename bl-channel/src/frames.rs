//! Realtime frame types for the marketplace channel.
//!
//! Every frame on the wire is a JSON object with a `type` discriminator.
//! Inbound frames are decoded exactly once at the channel boundary; the
//! rest of the application only ever sees the typed variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bl_core::error::{BlError, BlResult};
use bl_models::booking::BookingRecord;

/// Payload of a `chat_message` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    /// Room the message belongs to (one room per booking).
    pub room: String,
    /// Actor id of the sender.
    pub from: String,
    /// Message body.
    pub body: String,
    /// Server-side send timestamp.
    pub sent_at: DateTime<Utc>,
}

/// Payload of a `typing_indicator` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// Room the indicator belongs to.
    pub room: String,
    /// Actor id of the typist.
    pub from: String,
    /// Whether the indicator should be shown or cleared.
    pub typing: bool,
}

/// A frame received from the server.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// Full booking snapshot pushed after a server-side state change.
    BookingUpdate(BookingRecord),
    /// Chat message in a booking room.
    ChatMessage(ChatMessagePayload),
    /// Typing indicator in a booking room.
    TypingIndicator(TypingPayload),
    /// Heartbeat response.
    Pong,
    /// Frame type this client does not understand. Logged and dropped.
    Unknown(String),
}

impl InboundFrame {
    /// Decode a raw frame.
    ///
    /// Unrecognized `type` values decode to [`InboundFrame::Unknown`]
    /// rather than erroring so a newer server cannot wedge the channel.
    pub fn decode(raw: &str) -> BlResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| BlError::Serialization(format!("frame parse error: {e}")))?;

        let frame_type = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BlError::Channel("frame missing type field".into()))?;

        match frame_type {
            "booking_update" => {
                let booking = value
                    .get("booking")
                    .cloned()
                    .ok_or_else(|| BlError::Channel("booking_update without booking".into()))?;
                let record: BookingRecord = serde_json::from_value(booking)
                    .map_err(|e| BlError::Serialization(format!("booking snapshot: {e}")))?;
                Ok(Self::BookingUpdate(record))
            }
            "chat_message" => {
                let payload: ChatMessagePayload = serde_json::from_value(value)
                    .map_err(|e| BlError::Serialization(format!("chat_message: {e}")))?;
                Ok(Self::ChatMessage(payload))
            }
            "typing_indicator" => {
                let payload: TypingPayload = serde_json::from_value(value)
                    .map_err(|e| BlError::Serialization(format!("typing_indicator: {e}")))?;
                Ok(Self::TypingIndicator(payload))
            }
            "pong" => Ok(Self::Pong),
            other => Ok(Self::Unknown(other.to_string())),
        }
    }

    /// Wire name of the frame type, for logging.
    pub fn type_name(&self) -> &str {
        match self {
            Self::BookingUpdate(_) => "booking_update",
            Self::ChatMessage(_) => "chat_message",
            Self::TypingIndicator(_) => "typing_indicator",
            Self::Pong => "pong",
            Self::Unknown(s) => s.as_str(),
        }
    }
}

/// A frame sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Heartbeat probe.
    Ping,
    /// Send a chat message into a booking room.
    ChatMessage { room: String, body: String },
    /// Set or clear the local typing indicator in a room.
    TypingIndicator { room: String, typing: bool },
    /// Join a booking room to receive its chat and typing frames.
    JoinRoom { room: String },
    /// Leave a booking room.
    LeaveRoom { room: String },
}

impl OutboundFrame {
    /// Encode the frame for the wire.
    pub fn encode(&self) -> BlResult<String> {
        serde_json::to_string(self)
            .map_err(|e| BlError::Serialization(format!("frame encode error: {e}")))
    }
}

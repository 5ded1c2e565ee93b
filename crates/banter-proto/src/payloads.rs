//! Typed payloads for the reserved event names.
//!
//! The wire contract uses camelCase field names; every struct here renames
//! accordingly so Rust code stays snake_case. Inbound shapes are owned by
//! the server, so [`NewMsg`] treats everything beyond the attribution core
//! as optional and ignores fields it does not know.
//!
//! # Invariants
//!
//! Each payload variant maps to exactly one event name (enforced by match
//! exhaustiveness in [`Payload::name`] and [`Payload::from_event`]).

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    event::{Event, names},
};

/// Outbound message publication (`sendMsg`).
///
/// Fully stamped by the sender: the receiving side never has to consult
/// session state to know who sent it, when, or into which room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMsg {
    /// Message text, exactly as composed. Never empty.
    pub text: String,
    /// Human-readable send time from the sender's clock.
    pub client_timestamp: String,
    /// Stable user id of the sender.
    pub sender_user_id: String,
    /// Display name of the sender.
    pub sender_username: String,
    /// Room the message belongs to.
    pub room_id: String,
}

/// Inbound message broadcast (`newMsg`).
///
/// Only the attribution core is required: text, sender name, and the room
/// the message belongs to. Servers differ in what else they forward, so
/// the rest is optional and unknown fields are dropped on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMsg {
    /// Message text.
    pub message: String,
    /// Display name of the sender.
    pub sender_username: String,
    /// Room the message belongs to. Filing uses this, never the room the
    /// recipient happens to be looking at.
    pub room_id: String,
    /// Stable user id of the sender, when the server forwards it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_user_id: Option<String>,
    /// Sender-stamped display time, when the server forwards it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<String>,
}

/// Connection-loss notification (`disconnected`).
///
/// Raised locally by the connection manager when an attempt fails or a
/// live connection drops. Never received from the wire; the name is
/// reserved so application events cannot collide with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disconnected {
    /// Why the connection went away, as reported by the driver.
    pub reason: String,
}

/// All payloads this crate understands, tagged by event name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Outbound message publication.
    SendMsg(SendMsg),
    /// Inbound message broadcast.
    NewMsg(NewMsg),
    /// Local connection-loss notification.
    Disconnected(Disconnected),
}

impl Payload {
    /// Event name corresponding to this payload type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SendMsg(_) => names::SEND_MESSAGE,
            Self::NewMsg(_) => names::NEW_MESSAGE,
            Self::Disconnected(_) => names::DISCONNECTED,
        }
    }

    /// Wrap into an event envelope.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::JsonEncode` if the payload fails to serialize
    pub fn into_event(self) -> Result<Event> {
        let name = self.name();
        let data = match self {
            Self::SendMsg(inner) => serde_json::to_value(inner),
            Self::NewMsg(inner) => serde_json::to_value(inner),
            Self::Disconnected(inner) => serde_json::to_value(inner),
        }
        .map_err(|e| ProtocolError::JsonEncode(e.to_string()))?;

        Ok(Event::new(name, data))
    }

    /// Extract the typed payload from an event envelope.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownEvent` if the name has no payload type
    /// - `ProtocolError::JsonDecode` if the data does not match the type
    pub fn from_event(event: Event) -> Result<Self> {
        let decode_error = |e: serde_json::Error| ProtocolError::JsonDecode(e.to_string());

        match event.name.as_str() {
            names::SEND_MESSAGE => {
                Ok(Self::SendMsg(serde_json::from_value(event.data).map_err(decode_error)?))
            },
            names::NEW_MESSAGE => {
                Ok(Self::NewMsg(serde_json::from_value(event.data).map_err(decode_error)?))
            },
            names::DISCONNECTED => {
                Ok(Self::Disconnected(serde_json::from_value(event.data).map_err(decode_error)?))
            },
            _ => Err(ProtocolError::UnknownEvent(event.name)),
        }
    }
}

//! The `{event, data}` envelope.
//!
//! Events travel as UTF-8 JSON text. The envelope stays untyped on the
//! `data` side so the connection layer can route events it does not
//! understand; subscribers narrow the payload with [`crate::Payload`] or
//! their own deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Reserved event names.
///
/// Names are matched exactly and case-sensitively. The server owns this
/// vocabulary; adding a name here does not make the server emit it.
pub mod names {
    /// Outbound: publish a composed message to the server.
    pub const SEND_MESSAGE: &str = "sendMsg";

    /// Inbound: a message broadcast by the server, including the echo of
    /// our own sends.
    pub const NEW_MESSAGE: &str = "newMsg";

    /// Raised locally when the connection is lost or an attempt fails.
    /// Never sent on the wire.
    pub const DISCONNECTED: &str = "disconnected";
}

/// A named event with its JSON payload.
///
/// # Invariants
///
/// Round-trip encoding must produce an equivalent value: `decode(encode(e))
/// == e` for every event under [`Event::MAX_ENCODED_SIZE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event name. Selects the subscriber and the payload type.
    #[serde(rename = "event")]
    pub name: String,

    /// Payload. Left untyped here; decoded further by whoever subscribed
    /// to the name.
    pub data: Value,
}

impl Event {
    /// Maximum accepted size of an encoded event in bytes.
    ///
    /// Checked before parsing so a hostile peer cannot make us deserialize
    /// unbounded input.
    pub const MAX_ENCODED_SIZE: usize = 64 * 1024;

    /// Create an event from a name and a payload value.
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self { name: name.into(), data }
    }

    /// Encode to JSON text for the transport.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::JsonEncode` if serialization fails
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::JsonEncode(e.to_string()))
    }

    /// Decode from transport text.
    ///
    /// The size check runs before any parsing.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::EventTooLarge` if `text` exceeds [`Self::MAX_ENCODED_SIZE`]
    /// - `ProtocolError::JsonDecode` if `text` is not a valid envelope
    pub fn decode(text: &str) -> Result<Self> {
        if text.len() > Self::MAX_ENCODED_SIZE {
            return Err(ProtocolError::EventTooLarge {
                size: text.len(),
                max: Self::MAX_ENCODED_SIZE,
            });
        }

        serde_json::from_str(text).map_err(|e| ProtocolError::JsonDecode(e.to_string()))
    }
}

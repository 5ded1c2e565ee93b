//! Wire vocabulary for the Banter messaging protocol.
//!
//! Everything that crosses the persistent connection is one [`Event`]: a
//! name that selects the subscriber plus a JSON payload. This crate owns
//! the envelope, the typed payloads behind the reserved event names, and
//! nothing else: no sockets, no state, no room bookkeeping. The connection
//! layer moves [`Event`]s; subscribers decode [`Payload`]s.
//!
//! # Components
//!
//! - [`Event`]: the `{event, data}` envelope and its text codec
//! - [`Payload`]: typed payloads, one per known event name
//! - [`names`]: the reserved event names

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod event;
mod payloads;

pub use errors::{ProtocolError, Result};
pub use event::{Event, names};
pub use payloads::{Disconnected, NewMsg, Payload, SendMsg};

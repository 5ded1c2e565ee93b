//! Connection manager for the Banter messaging protocol.
//!
//! Manages the single persistent connection to the messaging endpoint:
//! lifecycle state, typed event subscription, and best-effort event
//! publication. The manager is sans-IO; a driver owns the actual network
//! work. This keeps the state machine pure and makes testing
//! straightforward.
//!
//! # Architecture
//!
//! [`Connection`] never touches a socket. A driver (the `transport`
//! feature's WebSocket pump, a simulation, or a test) calls
//! [`Connection::connect`], performs the I/O, reports outcomes and inbound
//! events through the `handle_*` methods, and drains
//! [`Connection::take_outgoing`] onto the wire. Reports carry the
//! [`ConnectionHandle`] from `connect`, so reports that straggle in after
//! a teardown or a reconnect identify themselves as stale and are dropped.
//!
//! # Components
//!
//! - [`Connection`]: lifecycle + dispatch state machine
//! - [`ConnectionHandle`]: generation tag for the stale-report check
//! - [`ConnectionError`]: operation errors with fatality classification
//! - [`transport`]: WebSocket driver (optional, `transport` feature)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod connection;
mod error;

#[cfg(feature = "transport")]
pub mod transport;

pub use banter_proto::Event;
pub use connection::{Connection, ConnectionHandle, ConnectionState, EventHandler};
pub use error::ConnectionError;

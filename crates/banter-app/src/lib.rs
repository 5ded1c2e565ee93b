//! Application layer for Banter.
//!
//! Keeps a room-scoped conversation store synchronized with the messaging
//! endpoint over a single persistent connection. Inbound messages are
//! filed under the room named in their own payload, so conversations
//! accumulate correctly no matter which room the user is looking at;
//! outbound messages are stamped with the session identity, the active
//! room, and a display timestamp, then published without any local
//! append - the server's echo is the one path into the store.
//!
//! # Components
//!
//! - [`RoomMessageStore`]: per-room append-only message state + active room
//! - [`Bridge`]: session lifecycle, inbound filing, outbound publication
//! - [`Identity`] / [`Clock`]: who is sending and what time to stamp

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod bridge;
mod clock;
mod error;
mod store;

pub use bridge::{Bridge, Identity, Phase};
pub use clock::{Clock, SystemClock};
pub use error::SyncError;
pub use store::{Message, RoomId, RoomMessageStore};

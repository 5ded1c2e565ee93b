//! Room-scoped conversation state.
//!
//! Messages live in per-room append-only sequences; which room is being
//! displayed is a separate piece of state that filing never consults.
//! Switching rooms is pure selection - nothing is fetched, nothing is
//! cleared, and background rooms keep accumulating.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]
#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Opaque room identifier.
///
/// Uniqueness is guaranteed by the room management collaborator; this
/// layer only ever compares ids for equality.
pub type RoomId = String;

/// A chat message scoped to exactly one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message text, exactly as composed. Never empty.
    pub text: String,
    /// Stable user id of the sender. Empty when the server did not
    /// forward one.
    pub sender_user_id: String,
    /// Display name of the sender.
    pub sender_username: String,
    /// Room this message belongs to.
    pub room_id: RoomId,
    /// Human-readable send time stamped by the sender.
    pub client_timestamp: String,
}

/// Store for per-room message history and the active room selection.
///
/// Thread-safe via Arc<Mutex<_>>. Clone shares the same underlying
/// storage, so the bridge, the room selector, and rendering can all hold
/// one. Locks are held only for the duration of a single operation.
#[derive(Clone, Default)]
pub struct RoomMessageStore {
    inner: Arc<Mutex<ConversationState>>,
}

/// Internal state for `RoomMessageStore`.
#[derive(Default)]
struct ConversationState {
    /// Message sequences per room, in arrival order.
    rooms: HashMap<RoomId, Vec<Message>>,
    /// Room selected for display. `None` until a room is chosen.
    active_room: Option<RoomId>,
}

impl RoomMessageStore {
    /// Create an empty store with no active room.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the room whose messages [`Self::active_messages`] returns.
    ///
    /// Pure selection: any history already accumulated for the room stays
    /// as it is, and nothing is fetched. Backfilling older history belongs
    /// to an external collaborator.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set_active_room(&self, room_id: impl Into<RoomId>) {
        let mut state = self.inner.lock().expect("RoomMessageStore mutex poisoned");
        state.active_room = Some(room_id.into());
    }

    /// Currently selected room, or `None` if no room has been chosen yet.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn active_room(&self) -> Option<RoomId> {
        self.inner.lock().expect("RoomMessageStore mutex poisoned").active_room.clone()
    }

    /// Append `message` to the sequence of its own room, creating the
    /// sequence if this is the room's first message.
    ///
    /// The target room comes from `message.room_id`, never from the active
    /// selection, so messages for background rooms accumulate correctly.
    /// Appended messages are never removed or reordered for the lifetime
    /// of the session.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn append_message(&self, message: Message) {
        let mut state = self.inner.lock().expect("RoomMessageStore mutex poisoned");
        state.rooms.entry(message.room_id.clone()).or_default().push(message);
    }

    /// Messages of the active room in arrival order.
    ///
    /// Empty when no room is selected or the selected room has no history
    /// yet.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn active_messages(&self) -> Vec<Message> {
        let state = self.inner.lock().expect("RoomMessageStore mutex poisoned");
        match &state.active_room {
            Some(room_id) => state.rooms.get(room_id).cloned().unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Messages of `room_id` in arrival order, active or not.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn messages_in(&self, room_id: &str) -> Vec<Message> {
        let state = self.inner.lock().expect("RoomMessageStore mutex poisoned");
        state.rooms.get(room_id).cloned().unwrap_or_default()
    }

    /// Number of messages accumulated for `room_id`.
    ///
    /// Useful for debugging and testing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn message_count(&self, room_id: &str) -> usize {
        let state = self.inner.lock().expect("RoomMessageStore mutex poisoned");
        state.rooms.get(room_id).map_or(0, Vec::len)
    }

    /// Rooms that have accumulated at least one message, sorted by id.
    ///
    /// Useful for debugging and testing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn room_ids(&self) -> Vec<RoomId> {
        let state = self.inner.lock().expect("RoomMessageStore mutex poisoned");
        let mut ids: Vec<RoomId> = state.rooms.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

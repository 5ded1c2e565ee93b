//! Connection-to-store synchronization layer.
//!
//! The [`Bridge`] wraps the low-level [`banter_client::Connection`] and
//! adapts it to the application session lifecycle.
//!
//! # Responsibilities
//!
//! - Subscribes to inbound `newMsg` traffic while the session is active
//!   and files every message into the [`RoomMessageStore`] under the room
//!   named in its own payload.
//! - Stamps composed messages with the active room, the session identity,
//!   and a display timestamp, then queues them for the driver.
//! - Tracks the session [`Phase`] across connection losses so subscribe
//!   and unsubscribe always pair up.
//!
//! # Session lifecycle
//!
//! ```text
//! ┌───────────────┐  start   ┌────────────────────┐  handle_open  ┌────────┐
//! │ Uninitialized │─────────>│ AwaitingConnection │──────────────>│ Active │
//! └───────────────┘          └────────────────────┘               └────────┘
//!                                      │                               │
//!                                      │ handle_connect_error          │ handle_close
//!                                      ↓                               ↓
//!                               ┌───────────┐                    ┌───────────┐
//!                               │ Suspended │<───────────────────│ Suspended │
//!                               └───────────┘                    └───────────┘
//! ```
//!
//! `start` from `Suspended` re-enters `AwaitingConnection` (reconnect);
//! [`Bridge::shutdown`] lands in `Terminated` from any phase. The inbound
//! subscription is acquired on entering `Active` and released on leaving
//! it, so a reconnect never stacks a second handler - the double-delivery
//! bug this layer exists to rule out.
//!
//! There is no optimistic local append on send. The server echoes every
//! publication back as a `newMsg`, and that echo is the single path into
//! the store; appending locally too would show the sender every own
//! message twice.

use banter_client::{Connection, ConnectionError, ConnectionHandle, ConnectionState};
use banter_proto::{Event, NewMsg, Payload, SendMsg, names};
use serde_json::Value;

use crate::{
    clock::{Clock, SystemClock},
    error::SyncError,
    store::{Message, RoomMessageStore},
};

/// Session identity stamped onto composed messages.
///
/// Supplied by the authentication collaborator and immutable for the
/// session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable user id.
    pub user_id: String,
    /// Display name shown next to messages.
    pub username: String,
}

impl Identity {
    /// Create a session identity.
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), username: username.into() }
    }
}

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created; no connection requested yet.
    Uninitialized,
    /// Connection requested; waiting for the driver's outcome report.
    AwaitingConnection,
    /// Connected, inbound subscription live, compose permitted.
    Active,
    /// Connection lost or attempt failed; compose fails fast until a
    /// reconnect.
    Suspended,
    /// Session over; subscriptions and connection released for good.
    Terminated,
}

/// Synchronization layer between the connection and the store.
///
/// Generic over [`Clock`] so tests and simulations stamp deterministic
/// timestamps.
pub struct Bridge<C: Clock = SystemClock> {
    connection: Connection,
    store: RoomMessageStore,
    identity: Identity,
    clock: C,
    phase: Phase,
    handle: Option<ConnectionHandle>,
    last_error: Option<ConnectionError>,
}

impl Bridge<SystemClock> {
    /// Create a bridge for `identity` with an empty store and the system
    /// clock.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self::with_clock(identity, SystemClock)
    }
}

impl<C: Clock> Bridge<C> {
    /// Create a bridge for `identity` stamping timestamps from `clock`.
    pub fn with_clock(identity: Identity, clock: C) -> Self {
        Self {
            connection: Connection::new(),
            store: RoomMessageStore::new(),
            identity,
            clock,
            phase: Phase::Uninitialized,
            handle: None,
            last_error: None,
        }
    }

    /// Request a connection to `endpoint`.
    ///
    /// Valid initially and again from `Suspended` or `Active`; each call
    /// supersedes the previous attempt, releasing its subscription first
    /// so the fresh connection re-subscribes exactly once. Ignored after
    /// [`Self::shutdown`].
    pub fn start(&mut self, endpoint: &str) {
        if self.phase == Phase::Terminated {
            tracing::warn!("session terminated, ignoring start");
            return;
        }
        if self.phase == Phase::Active {
            self.connection.unsubscribe(names::NEW_MESSAGE);
        }

        self.last_error = None;
        self.handle = Some(self.connection.connect(endpoint));
        self.phase = Phase::AwaitingConnection;
    }

    /// Driver report: the connection attempt succeeded.
    ///
    /// Enters `Active` and acquires the inbound subscription.
    pub fn handle_open(&mut self) {
        let Some(handle) = self.handle.clone() else {
            tracing::debug!("open report without a connection attempt");
            return;
        };
        if self.phase != Phase::AwaitingConnection {
            tracing::debug!(phase = ?self.phase, "ignoring open report");
            return;
        }

        self.connection.handle_open(&handle);
        if self.connection.state() != ConnectionState::Connected {
            return;
        }

        self.phase = Phase::Active;
        self.subscribe_inbound();
    }

    /// Driver report: the connection attempt failed.
    ///
    /// Enters `Suspended`; [`Self::last_error`] records the failure.
    /// Reconnecting is a collaborator's call, not an automatic retry. A
    /// report arriving while the session is already `Active` is treated
    /// like a close, so phase and connection state cannot drift apart.
    pub fn handle_connect_error(&mut self, reason: impl Into<String>) {
        let Some(handle) = self.handle.clone() else {
            tracing::debug!("connect error report without a connection attempt");
            return;
        };

        let reason = reason.into();
        self.connection.handle_connect_error(&handle, reason.clone());
        match self.phase {
            Phase::AwaitingConnection => {
                self.last_error = Some(ConnectionError::ConnectFailed { reason });
                self.phase = Phase::Suspended;
            },
            Phase::Active => {
                self.connection.unsubscribe(names::NEW_MESSAGE);
                self.last_error = Some(ConnectionError::Lost { reason });
                self.phase = Phase::Suspended;
            },
            Phase::Uninitialized | Phase::Suspended | Phase::Terminated => {},
        }
    }

    /// Driver report: the live connection dropped.
    ///
    /// Releases the inbound subscription and enters `Suspended`. Messages
    /// queued but not yet drained are lost with the connection; the loss
    /// is visible through [`Self::last_error`] and the reserved
    /// `disconnected` event, which fires before the subscription is
    /// released. A report arriving while still `AwaitingConnection` is
    /// recorded as a failed attempt.
    pub fn handle_close(&mut self, reason: impl Into<String>) {
        let Some(handle) = self.handle.clone() else {
            tracing::debug!("close report without a connection attempt");
            return;
        };

        let reason = reason.into();
        self.connection.handle_close(&handle, reason.clone());
        match self.phase {
            Phase::AwaitingConnection => {
                self.last_error = Some(ConnectionError::ConnectFailed { reason });
                self.phase = Phase::Suspended;
            },
            Phase::Active => {
                self.connection.unsubscribe(names::NEW_MESSAGE);
                self.last_error = Some(ConnectionError::Lost { reason });
                self.phase = Phase::Suspended;
            },
            Phase::Uninitialized | Phase::Suspended | Phase::Terminated => {},
        }
    }

    /// Driver report: an inbound event arrived.
    ///
    /// Routed through the connection's dispatch, so stale traffic from a
    /// superseded connection is dropped before any handler runs.
    pub fn handle_event(&mut self, event: Event) {
        let Some(handle) = self.handle.clone() else {
            tracing::debug!(event = %event.name, "event before any connection attempt");
            return;
        };

        self.connection.handle_event(&handle, event);
    }

    /// Compose and publish `text` to the active room.
    ///
    /// Stamps the current active room, the session identity, and the
    /// clock's display timestamp, then queues the event for the driver.
    /// Success means queued, not delivered: there is no acknowledgment,
    /// and a loss before the driver drains the queue drops the message.
    /// The composer is cleared by the caller on submit either way; a lost
    /// message surfaces through the `disconnected` event, not by
    /// restoring the draft.
    ///
    /// # Errors
    ///
    /// - [`SyncError::EmptyMessage`] if `text` is empty or whitespace-only
    /// - [`SyncError::NoActiveRoom`] if no room is selected
    /// - [`SyncError::Connection`] if the connection is not live
    pub fn compose(&mut self, text: &str) -> Result<(), SyncError> {
        if text.trim().is_empty() {
            return Err(SyncError::EmptyMessage);
        }
        let Some(room_id) = self.store.active_room() else {
            return Err(SyncError::NoActiveRoom);
        };

        let payload = Payload::SendMsg(SendMsg {
            text: text.to_string(),
            client_timestamp: self.clock.display_timestamp(),
            sender_user_id: self.identity.user_id.clone(),
            sender_username: self.identity.username.clone(),
            room_id,
        });
        let event = payload.into_event()?;
        self.connection.emit(event)?;

        Ok(())
    }

    /// End the session.
    ///
    /// Releases the inbound subscription and the connection; outstanding
    /// handles go stale, so driver reports that straggle in afterwards are
    /// ignored. Idempotent.
    pub fn shutdown(&mut self) {
        if self.phase == Phase::Terminated {
            return;
        }

        self.connection.unsubscribe(names::NEW_MESSAGE);
        self.connection.disconnect();
        self.handle = None;
        self.phase = Phase::Terminated;
    }

    /// Register a handler for a named event on the underlying connection.
    ///
    /// The `newMsg` subscription is managed by the bridge itself;
    /// collaborators use this for the reserved `disconnected` event.
    pub fn subscribe(
        &mut self,
        event: impl Into<String>,
        handler: impl FnMut(Value) + Send + 'static,
    ) -> Result<(), ConnectionError> {
        self.connection.subscribe(event, handler)
    }

    /// Remove the handler for `event`. Idempotent.
    pub fn unsubscribe(&mut self, event: &str) {
        self.connection.unsubscribe(event);
    }

    /// Session lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Connection state, for presentation connectivity affordances.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Most recent connection failure. Cleared by the next `start`.
    #[must_use]
    pub fn last_error(&self) -> Option<&ConnectionError> {
        self.last_error.as_ref()
    }

    /// Conversation store. Clone it to share with the room selector and
    /// rendering.
    #[must_use]
    pub fn store(&self) -> &RoomMessageStore {
        &self.store
    }

    /// Session identity.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Take queued outbound events for the driver to send.
    pub fn take_outgoing(&mut self) -> Vec<Event> {
        self.connection.take_outgoing()
    }

    fn subscribe_inbound(&mut self) {
        let store = self.store.clone();
        let result = self.connection.subscribe(names::NEW_MESSAGE, move |data| {
            match serde_json::from_value::<NewMsg>(data) {
                Ok(inbound) => {
                    // Filing uses the room in the payload itself, never the
                    // room the user happens to be looking at.
                    store.append_message(Message {
                        text: inbound.message,
                        sender_user_id: inbound.sender_user_id.unwrap_or_default(),
                        sender_username: inbound.sender_username,
                        room_id: inbound.room_id,
                        client_timestamp: inbound.client_timestamp.unwrap_or_default(),
                    });
                },
                Err(error) => {
                    tracing::warn!(%error, "dropping undecodable inbound message");
                },
            }
        });

        if let Err(error) = result {
            // A stacked handler would file every message twice.
            tracing::error!(%error, "inbound subscription already present");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use banter_proto::Disconnected;

    use super::*;

    struct FixedClock;

    impl Clock for FixedClock {
        fn display_timestamp(&self) -> String {
            "14:05 08/25".to_string()
        }
    }

    fn bridge() -> Bridge<FixedClock> {
        Bridge::with_clock(Identity::new("u-1", "alice"), FixedClock)
    }

    /// Bridge that has been started and has a live connection.
    fn active_bridge() -> Bridge<FixedClock> {
        let mut bridge = bridge();
        bridge.start("ws://localhost:4000");
        bridge.handle_open();
        bridge
    }

    fn echo(room: &str, username: &str, text: &str) -> Event {
        Payload::NewMsg(NewMsg {
            message: text.to_string(),
            sender_username: username.to_string(),
            room_id: room.to_string(),
            sender_user_id: None,
            client_timestamp: None,
        })
        .into_event()
        .unwrap()
    }

    #[test]
    fn starts_uninitialized() {
        let bridge = bridge();

        assert_eq!(bridge.phase(), Phase::Uninitialized);
        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
        assert!(bridge.store().active_messages().is_empty());
    }

    #[test]
    fn start_then_open_activates() {
        let mut bridge = bridge();

        bridge.start("ws://localhost:4000");
        assert_eq!(bridge.phase(), Phase::AwaitingConnection);
        assert_eq!(bridge.connection_state(), ConnectionState::Connecting);

        bridge.handle_open();
        assert_eq!(bridge.phase(), Phase::Active);
        assert_eq!(bridge.connection_state(), ConnectionState::Connected);
    }

    #[test]
    fn compose_rejects_empty_and_whitespace() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");

        assert_eq!(bridge.compose(""), Err(SyncError::EmptyMessage));
        assert_eq!(bridge.compose("   \t\n"), Err(SyncError::EmptyMessage));
        assert!(bridge.take_outgoing().is_empty(), "nothing may reach the wire");
    }

    #[test]
    fn compose_requires_an_active_room() {
        let mut bridge = active_bridge();

        assert_eq!(bridge.compose("hello"), Err(SyncError::NoActiveRoom));
        assert!(bridge.take_outgoing().is_empty());
    }

    #[test]
    fn compose_requires_a_live_connection() {
        let mut bridge = bridge();
        bridge.store().set_active_room("general");
        bridge.start("ws://localhost:4000");

        let result = bridge.compose("hello");

        assert!(matches!(result, Err(SyncError::Connection(ConnectionError::NotConnected { .. }))));
    }

    #[test]
    fn compose_stamps_room_identity_and_time() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");

        bridge.compose("hello everyone").unwrap();

        let outgoing = bridge.take_outgoing();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].name, names::SEND_MESSAGE);

        let Payload::SendMsg(msg) = Payload::from_event(outgoing[0].clone()).unwrap() else {
            unreachable!("sendMsg event must decode to SendMsg");
        };
        assert_eq!(msg.text, "hello everyone");
        assert_eq!(msg.room_id, "general");
        assert_eq!(msg.sender_user_id, "u-1");
        assert_eq!(msg.sender_username, "alice");
        assert_eq!(msg.client_timestamp, "14:05 08/25");
    }

    #[test]
    fn compose_keeps_text_exactly_as_typed() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");

        bridge.compose("  padded but not empty  ").unwrap();

        let outgoing = bridge.take_outgoing();
        let Payload::SendMsg(msg) = Payload::from_event(outgoing[0].clone()).unwrap() else {
            unreachable!("sendMsg event must decode to SendMsg");
        };
        assert_eq!(msg.text, "  padded but not empty  ", "trim is only for the emptiness check");
    }

    #[test]
    fn compose_does_not_append_locally() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");

        bridge.compose("hello").unwrap();

        assert!(bridge.store().active_messages().is_empty(), "echo is the only insertion path");
    }

    #[test]
    fn echo_is_the_single_insertion_path() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");
        bridge.compose("hello").unwrap();

        bridge.handle_event(echo("general", "alice", "hello"));

        let messages = bridge.store().active_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello");
    }

    #[test]
    fn inbound_is_filed_by_payload_room() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");

        bridge.handle_event(echo("random", "bob", "over here"));

        assert!(bridge.store().active_messages().is_empty(), "active room must stay clean");
        assert_eq!(bridge.store().message_count("random"), 1);

        bridge.store().set_active_room("random");
        assert_eq!(bridge.store().active_messages()[0].text, "over here");
    }

    #[test]
    fn undecodable_inbound_is_dropped() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");

        bridge.handle_event(Event::new(names::NEW_MESSAGE, serde_json::json!({ "junk": true })));

        assert!(bridge.store().active_messages().is_empty());
        assert!(bridge.store().room_ids().is_empty());
    }

    #[test]
    fn close_suspends_and_records_the_loss() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");

        bridge.handle_close("connection reset");

        assert_eq!(bridge.phase(), Phase::Suspended);
        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
        assert_eq!(
            bridge.last_error(),
            Some(&ConnectionError::Lost { reason: "connection reset".to_string() })
        );
        assert!(matches!(bridge.compose("hi"), Err(SyncError::Connection(_))));
    }

    #[test]
    fn close_during_an_attempt_suspends_as_a_failed_attempt() {
        let mut bridge = bridge();
        bridge.start("ws://localhost:4000");

        bridge.handle_close("socket dropped mid handshake");

        assert_eq!(bridge.phase(), Phase::Suspended);
        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
        assert_eq!(
            bridge.last_error(),
            Some(&ConnectionError::ConnectFailed {
                reason: "socket dropped mid handshake".to_string()
            })
        );
    }

    #[test]
    fn connect_error_suspends_and_records_the_failure() {
        let mut bridge = bridge();
        bridge.start("ws://localhost:4000");

        bridge.handle_connect_error("connection refused");

        assert_eq!(bridge.phase(), Phase::Suspended);
        assert_eq!(
            bridge.last_error(),
            Some(&ConnectionError::ConnectFailed { reason: "connection refused".to_string() })
        );
    }

    #[test]
    fn connect_error_while_active_suspends_like_a_loss() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");

        bridge.handle_connect_error("tcp reset");

        // Phase must follow the connection down, not stay Active.
        assert_eq!(bridge.phase(), Phase::Suspended);
        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
        assert_eq!(
            bridge.last_error(),
            Some(&ConnectionError::Lost { reason: "tcp reset".to_string() })
        );

        bridge.start("ws://localhost:4000");
        bridge.handle_open();
        bridge.handle_event(echo("general", "bob", "back online"));
        assert_eq!(bridge.store().active_messages().len(), 1, "exactly one handler may file");
    }

    #[test]
    fn disconnected_event_reaches_its_subscriber() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut bridge = active_bridge();
        bridge
            .subscribe(names::DISCONNECTED, move |data| {
                tx.send(data).unwrap();
            })
            .unwrap();

        bridge.handle_close("connection reset");

        let data = rx.try_recv().unwrap();
        let notice: Disconnected = serde_json::from_value(data).unwrap();
        assert_eq!(notice.reason, "connection reset");
    }

    #[test]
    fn reconnect_resubscribes_exactly_once() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");
        bridge.handle_close("connection reset");

        bridge.start("ws://localhost:4000");
        bridge.handle_open();
        assert_eq!(bridge.phase(), Phase::Active);
        assert!(bridge.last_error().is_none(), "start clears the recorded loss");

        bridge.handle_event(echo("general", "bob", "welcome back"));

        assert_eq!(bridge.store().active_messages().len(), 1, "exactly one handler may file");
    }

    #[test]
    fn restart_while_active_does_not_stack_handlers() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");

        bridge.start("ws://localhost:4001");
        bridge.handle_open();
        bridge.handle_event(echo("general", "bob", "fresh wire"));

        assert_eq!(bridge.store().active_messages().len(), 1);
    }

    #[test]
    fn events_between_restart_and_open_are_not_filed() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");

        // start released the inbound subscription; it returns on open.
        bridge.start("ws://localhost:4001");
        bridge.handle_event(echo("general", "bob", "late straggler"));

        assert!(bridge.store().active_messages().is_empty());
    }

    #[test]
    fn shutdown_terminates_and_ignores_everything_after() {
        let mut bridge = active_bridge();
        bridge.store().set_active_room("general");

        bridge.shutdown();
        assert_eq!(bridge.phase(), Phase::Terminated);
        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);

        bridge.handle_event(echo("general", "bob", "too late"));
        assert!(bridge.store().active_messages().is_empty());

        bridge.start("ws://localhost:4000");
        assert_eq!(bridge.phase(), Phase::Terminated, "terminated sessions do not restart");
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut bridge = active_bridge();

        bridge.shutdown();
        bridge.shutdown();

        assert_eq!(bridge.phase(), Phase::Terminated);
    }

    #[test]
    fn identity_is_exposed_for_presentation() {
        let bridge = bridge();

        assert_eq!(bridge.identity(), &Identity::new("u-1", "alice"));
    }
}

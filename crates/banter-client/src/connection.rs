//! Connection lifecycle state machine.
//!
//! Manages connection state, the per-event handler registry, and the
//! outgoing event queue. The machine performs no I/O: a driver observes
//! [`Connection::connect`], does the network work, and reports outcomes
//! back through the `handle_*` methods.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐   connect    ┌────────────┐   handle_open   ┌───────────┐
//! │ Disconnected │─────────────>│ Connecting │────────────────>│ Connected │
//! └──────────────┘              └────────────┘                 └───────────┘
//!        ↑                            │                              │
//!        │     handle_connect_error   │            handle_close      │
//!        │<───────────────────────────┘<─────────────────────────────┘
//! ```
//!
//! Both failure transitions raise the reserved `disconnected` event to its
//! subscriber, so interested parties observe the loss without polling.
//! [`Connection::disconnect`] also returns to `Disconnected` but raises
//! nothing: teardown requested locally is not a failure.
//!
//! # Stale reports
//!
//! Every `connect` starts a new generation and hands back a
//! [`ConnectionHandle`] carrying it. Driver reports quote the handle; a
//! report whose generation is not current belongs to a superseded attempt
//! and is logged and dropped. This is what makes teardown races safe: a
//! socket callback that fires after `disconnect` finds its handle stale.
//!
//! # Dispatch
//!
//! Handlers run to completion on the calling thread before the next report
//! is processed, so a handler observes every prior event's effects. A
//! handler receives only the event payload; it must not reach back into
//! the connection.

use std::collections::{HashMap, hash_map::Entry};

use banter_proto::{Disconnected, Event, Payload, names};
use serde_json::Value;

use crate::error::ConnectionError;

/// Callback invoked with the payload of each event it is subscribed to.
pub type EventHandler = Box<dyn FnMut(Value) + Send>;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection. Initial state, and where every loss lands.
    Disconnected,
    /// `connect` was called; waiting for the driver's outcome report.
    Connecting,
    /// Live connection; `emit` is permitted.
    Connected,
}

/// Handle identifying one connection attempt.
///
/// Returned by [`Connection::connect`]. The driver passes it back with
/// every report so reports from a superseded attempt can be told apart
/// from current ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    generation: u64,
}

/// Manager for the single persistent connection.
///
/// Subscriptions are scoped to the manager, not to one attempt: handlers
/// survive a reconnect, and releasing them is always an explicit
/// [`Connection::unsubscribe`].
pub struct Connection {
    state: ConnectionState,
    endpoint: Option<String>,
    generation: u64,
    handlers: HashMap<String, EventHandler>,
    outgoing: Vec<Event>,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    /// Create a manager with no connection and no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            endpoint: None,
            generation: 0,
            handlers: HashMap::new(),
            outgoing: Vec::new(),
        }
    }

    /// Begin a connection attempt to `endpoint`.
    ///
    /// Never blocks and never fails synchronously; the driver reports the
    /// outcome later through [`Self::handle_open`] or
    /// [`Self::handle_connect_error`]. Calling while an attempt or a live
    /// connection exists supersedes it: handles issued before this call
    /// are stale from here on, and events queued for the old connection
    /// are dropped.
    pub fn connect(&mut self, endpoint: impl Into<String>) -> ConnectionHandle {
        let endpoint = endpoint.into();
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        self.endpoint = Some(endpoint);
        self.outgoing.clear();

        tracing::debug!(
            endpoint = self.endpoint.as_deref(),
            generation = self.generation,
            "starting connection attempt"
        );
        ConnectionHandle { generation: self.generation }
    }

    /// Driver report: the attempt identified by `handle` succeeded.
    ///
    /// Stale or out-of-state reports are logged and dropped.
    pub fn handle_open(&mut self, handle: &ConnectionHandle) {
        if self.is_stale(handle) {
            tracing::debug!(generation = handle.generation, "ignoring open for stale handle");
            return;
        }
        if self.state != ConnectionState::Connecting {
            tracing::debug!(state = ?self.state, "ignoring open outside a connection attempt");
            return;
        }

        self.state = ConnectionState::Connected;
        tracing::debug!(endpoint = self.endpoint.as_deref(), "connected");
    }

    /// Driver report: the attempt identified by `handle` failed.
    ///
    /// Lands in `Disconnected` and raises the reserved `disconnected`
    /// event with the driver's reason. Stale reports are dropped, as are
    /// reports arriving after the loss was already recorded.
    pub fn handle_connect_error(&mut self, handle: &ConnectionHandle, reason: impl Into<String>) {
        if self.is_stale(handle) {
            tracing::debug!(generation = handle.generation, "ignoring error for stale handle");
            return;
        }
        if self.state == ConnectionState::Disconnected {
            tracing::debug!("ignoring connect error while already disconnected");
            return;
        }

        let reason = reason.into();
        tracing::warn!(%reason, "connection attempt failed");
        self.fail(reason);
    }

    /// Driver report: the live connection identified by `handle` dropped.
    ///
    /// Events still queued in the outgoing buffer are discarded; delivery
    /// is best-effort and the loss is what the raised `disconnected` event
    /// announces. Stale and repeated reports are dropped.
    pub fn handle_close(&mut self, handle: &ConnectionHandle, reason: impl Into<String>) {
        if self.is_stale(handle) {
            tracing::debug!(generation = handle.generation, "ignoring close for stale handle");
            return;
        }
        if self.state == ConnectionState::Disconnected {
            tracing::debug!("ignoring close while already disconnected");
            return;
        }

        let reason = reason.into();
        tracing::warn!(%reason, "connection lost");
        self.fail(reason);
    }

    /// Driver report: an inbound event arrived on the connection
    /// identified by `handle`.
    ///
    /// Dispatches to the handler subscribed to the event's name. Events
    /// nobody subscribed to are logged and dropped, not queued. Stale
    /// reports are dropped before dispatch, so handlers never see traffic
    /// from a connection that was torn down. The reserved `disconnected`
    /// name is raised locally only; a wire event carrying it is dropped so
    /// a peer cannot fake a connection loss to subscribers.
    pub fn handle_event(&mut self, handle: &ConnectionHandle, event: Event) {
        if self.is_stale(handle) {
            tracing::debug!(event = %event.name, "ignoring event for stale handle");
            return;
        }
        if event.name == names::DISCONNECTED {
            tracing::warn!("dropping wire event carrying the reserved disconnected name");
            return;
        }

        self.dispatch(event);
    }

    /// Register `handler` for events named `event`.
    ///
    /// One handler per name. Registering over a live subscription fails
    /// with [`ConnectionError::DuplicateSubscription`] and leaves the
    /// existing handler in place: the first subscriber keeps receiving,
    /// and the caller has a lifecycle bug to fix.
    pub fn subscribe(
        &mut self,
        event: impl Into<String>,
        handler: impl FnMut(Value) + Send + 'static,
    ) -> Result<(), ConnectionError> {
        match self.handlers.entry(event.into()) {
            Entry::Occupied(entry) => {
                Err(ConnectionError::DuplicateSubscription { event: entry.key().clone() })
            },
            Entry::Vacant(entry) => {
                entry.insert(Box::new(handler));
                Ok(())
            },
        }
    }

    /// Remove the handler for `event`, if any.
    ///
    /// Idempotent: removing a name with no handler is a no-op, so cleanup
    /// paths can unsubscribe unconditionally.
    pub fn unsubscribe(&mut self, event: &str) {
        self.handlers.remove(event);
    }

    /// Queue `event` for the driver to send.
    ///
    /// Best-effort: a queued event is dropped if the connection goes away
    /// before the driver drains the queue, and no acknowledgment exists.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::NotConnected`] unless the connection is live
    pub fn emit(&mut self, event: Event) -> Result<(), ConnectionError> {
        if self.state != ConnectionState::Connected {
            return Err(ConnectionError::NotConnected { state: self.state, operation: "emit" });
        }

        self.outgoing.push(event);
        Ok(())
    }

    /// Take the queued outgoing events for sending.
    ///
    /// The driver calls this after each batch of activity and writes the
    /// returned events to the wire in order.
    pub fn take_outgoing(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outgoing)
    }

    /// Release the connection.
    ///
    /// Outstanding handles go stale and queued events are dropped. No
    /// `disconnected` event is raised: the teardown was requested locally,
    /// not inflicted by the network. Handlers stay registered until
    /// explicitly unsubscribed.
    pub fn disconnect(&mut self) {
        self.generation += 1;
        self.state = ConnectionState::Disconnected;
        self.endpoint = None;
        self.outgoing.clear();
    }

    /// Whether `handle` belongs to a superseded connection attempt.
    #[must_use]
    pub fn is_stale(&self, handle: &ConnectionHandle) -> bool {
        handle.generation != self.generation
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Endpoint of the current attempt or live connection.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Whether a handler is registered for `event`.
    #[must_use]
    pub fn is_subscribed(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Record the loss and raise `disconnected`.
    fn fail(&mut self, reason: String) {
        self.state = ConnectionState::Disconnected;
        self.outgoing.clear();

        match Payload::Disconnected(Disconnected { reason }).into_event() {
            Ok(event) => self.dispatch(event),
            Err(error) => tracing::error!(%error, "failed to encode disconnected event"),
        }
    }

    fn dispatch(&mut self, event: Event) {
        match self.handlers.get_mut(&event.name) {
            Some(handler) => handler(event.data),
            None => tracing::debug!(event = %event.name, "dropping event with no subscriber"),
        }
    }
}

//! Connection manager error types.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors from connection manager operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The connection attempt failed before a connection was established.
    #[error("connection attempt failed: {reason}")]
    ConnectFailed {
        /// Failure reason reported by the driver.
        reason: String,
    },

    /// A previously live connection dropped.
    #[error("connection lost: {reason}")]
    Lost {
        /// Loss reason reported by the driver.
        reason: String,
    },

    /// Operation requires a live connection.
    #[error("cannot {operation} while {state:?}")]
    NotConnected {
        /// Connection state at the time of the call.
        state: ConnectionState,
        /// Operation that was refused.
        operation: &'static str,
    },

    /// A handler is already registered for this event name.
    ///
    /// Left in place, a second handler would deliver every event twice.
    #[error("duplicate subscription for event {event:?}")]
    DuplicateSubscription {
        /// Event name that already has a handler.
        event: String,
    },
}

impl ConnectionError {
    /// Whether this error is a programming bug rather than a network
    /// condition.
    ///
    /// Fatal errors mean the session bookkeeping is broken and reconnecting
    /// will not help. Non-fatal errors are network weather that an external
    /// reconnect policy may recover from.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::DuplicateSubscription { .. } => true,
            Self::ConnectFailed { .. } | Self::Lost { .. } | Self::NotConnected { .. } => false,
        }
    }
}

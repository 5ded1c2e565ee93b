//! Synchronization layer error types.

use banter_client::ConnectionError;
use banter_proto::ProtocolError;
use thiserror::Error;

/// Errors from compose and session-control operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Composed text was empty or whitespace-only.
    #[error("message text is empty")]
    EmptyMessage,

    /// No room is selected to receive the composed message.
    #[error("no active room selected")]
    NoActiveRoom,

    /// The underlying connection refused the operation.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The payload could not be encoded for the wire.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

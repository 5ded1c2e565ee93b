//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding events.
///
/// Carries enough context to log a useful diagnostic without holding on to
/// the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// JSON serialization failed.
    #[error("JSON encode error: {0}")]
    JsonEncode(String),

    /// JSON deserialization failed.
    #[error("JSON decode error: {0}")]
    JsonDecode(String),

    /// Encoded event exceeds the size ceiling.
    #[error("event too large: {size} bytes (max {max})")]
    EventTooLarge {
        /// Actual encoded size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// Event name has no payload type associated with it.
    #[error("unknown event name: {0:?}")]
    UnknownEvent(String),
}

//! Dispatch layer errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`DispatchError::NotFound`] | `DISPATCH_NOT_FOUND` | Yes |
//! | [`DispatchError::OutOfRange`] | `DISPATCH_OUT_OF_RANGE` | No |
//! | [`DispatchError::Marshal`] | `DISPATCH_MARSHAL` | No |
//! | [`DispatchError::Invocation`] | `DISPATCH_INVOCATION` | No |
//! | [`DispatchError::Closed`] | `DISPATCH_CLOSED` | No |
//! | [`DispatchError::Startup`] | `DISPATCH_STARTUP` | No |
//!
//! `NotFound` is recoverable: the event may simply not be registered yet.
//!
//! `subscribe`, `unsubscribe` and timer creation report these errors to
//! their caller. `emit` only checks that the event exists when the message
//! is enqueued; an event removed before the message is dequeued drops the
//! emission without an error.

use orbit_types::ErrorCode;
use thiserror::Error;

/// Error returned by registry operations and the host/script bridge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Event name is not registered.
    #[error("event does not exist: {0}")]
    NotFound(String),

    /// Subscription index is negative or past the end of the subscriber list.
    #[error("subscription index out of range: {index} (event '{event}' has {len} subscribers)")]
    OutOfRange {
        event: String,
        index: i64,
        len: usize,
    },

    /// A value could not cross the host/script boundary.
    #[error("cannot marshal value: {0}")]
    Marshal(String),

    /// A subscriber callback raised an error.
    #[error("callback failed: {0}")]
    Invocation(String),

    /// The event loop has shut down.
    #[error("event loop is shut down")]
    Closed,

    /// The dispatcher thread could not be started.
    #[error("event loop failed to start: {0}")]
    Startup(String),
}

impl DispatchError {
    /// Creates an out-of-range error.
    pub fn out_of_range(event: impl Into<String>, index: i64, len: usize) -> Self {
        Self::OutOfRange {
            event: event.into(),
            index,
            len,
        }
    }
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "DISPATCH_NOT_FOUND",
            Self::OutOfRange { .. } => "DISPATCH_OUT_OF_RANGE",
            Self::Marshal(_) => "DISPATCH_MARSHAL",
            Self::Invocation(_) => "DISPATCH_INVOCATION",
            Self::Closed => "DISPATCH_CLOSED",
            Self::Startup(_) => "DISPATCH_STARTUP",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

//! Identifier types.
//!
//! Event names are plain strings chosen by the host or script. The only
//! identifiers orbit generates itself are the names of auto-created timer
//! events and the identity of each dispatcher instance.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Name of an auto-created timer event.
///
/// Rendered as `timer:<uuid>` so it can never collide with another timer
/// and is easy to tell apart from host-chosen event names in logs.
///
/// # Example
///
/// ```
/// use orbit_types::TimerId;
///
/// let a = TimerId::new();
/// let b = TimerId::new();
/// assert_ne!(a, b);
/// assert!(a.to_string().starts_with("timer:"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(pub Uuid);

#[allow(clippy::new_without_default)] // a fresh id per call; Default would hide that
impl TimerId {
    /// Creates a new random timer id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer:{}", self.0)
    }
}

/// Process-unique identity of one dispatcher instance.
///
/// Used to tell whether the current thread is executing inside a given
/// loop's dispatch context when several loops coexist in one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopId(u64);

static NEXT_LOOP_ID: AtomicU64 = AtomicU64::new(1);

#[allow(clippy::new_without_default)]
impl LoopId {
    /// Allocates the next loop id.
    #[must_use]
    pub fn new() -> Self {
        Self(NEXT_LOOP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for LoopId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loop:{}", self.0)
    }
}

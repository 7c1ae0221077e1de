//! Shared types for orbit.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  orbit-types    : ErrorCode, TimerId, LoopId   ◄── HERE     │
//! │  orbit-event    : EventHooks, Subscription, DispatchError   │
//! │  orbit-runtime  : EventLoop, Registry, timers, config       │
//! │  orbit-lua      : mlua bridge                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod error;
mod id;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{LoopId, TimerId};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_id_display() {
        let id = TimerId::new();
        let display = format!("{id}");
        assert!(display.starts_with("timer:"));
        assert!(display.contains(&id.uuid().to_string()));
    }

    #[test]
    fn timer_id_uniqueness() {
        assert_ne!(TimerId::new(), TimerId::new());
    }

    #[test]
    fn loop_ids_are_monotonic() {
        let a = LoopId::new();
        let b = LoopId::new();
        assert_ne!(a, b);
        assert!(format!("{b}").starts_with("loop:"));
    }
}

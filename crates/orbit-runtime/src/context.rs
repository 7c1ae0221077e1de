//! Dispatch context of the current thread.
//!
//! The registry lives in the dispatcher thread's thread-local slot for
//! the whole lifetime of the loop. Code running on that thread (the loop
//! itself, and any host or script callback it invokes) reaches the
//! registry directly; every other thread has to go through the loop's
//! channels.
//!
//! ```text
//!   host thread                      dispatcher thread
//!   ───────────                      ─────────────────
//!   subscribe() ── command_tx ──►    ACTIVE = { loop:1, registry }
//!        ▲                               │ dispatch → callback
//!        └──────── reply ◄───────────    │   └─ subscribe() ─► with_registry()
//! ```
//!
//! A callback must never block on a reply from its own loop, so the
//! direct path is what keeps re-entrant calls deadlock-free.
//!
//! Borrows of the slot are short and never span a callback invocation.

use crate::registry::Registry;
use orbit_types::LoopId;
use std::cell::RefCell;

struct ActiveLoop {
    id: LoopId,
    registry: Registry,
}

thread_local! {
    static ACTIVE: RefCell<Option<ActiveLoop>> = const { RefCell::new(None) };
}

/// Clears the thread's dispatch context on drop.
pub(crate) struct ContextGuard {
    id: LoopId,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let taken = ACTIVE.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref().is_some_and(|active| active.id == self.id) {
                slot.take()
            } else {
                None
            }
        });
        // Drop outside the borrow: subscriber callbacks may own arbitrary state.
        drop(taken);
    }
}

/// Installs `registry` as the current thread's dispatch context for loop `id`.
pub(crate) fn enter(id: LoopId, registry: Registry) -> ContextGuard {
    ACTIVE.with(|slot| {
        *slot.borrow_mut() = Some(ActiveLoop { id, registry });
    });
    ContextGuard { id }
}

/// Returns `true` if the current thread is loop `id`'s dispatcher.
pub(crate) fn is_active(id: LoopId) -> bool {
    ACTIVE.with(|slot| slot.borrow().as_ref().is_some_and(|active| active.id == id))
}

/// Runs `f` against loop `id`'s registry if called from its dispatcher thread.
///
/// Returns `None` on any other thread.
pub(crate) fn with_registry<R>(id: LoopId, f: impl FnOnce(&mut Registry) -> R) -> Option<R> {
    ACTIVE.with(|slot| {
        let mut slot = slot.borrow_mut();
        match slot.as_mut() {
            Some(active) if active.id == id => Some(f(&mut active.registry)),
            _ => None,
        }
    })
}

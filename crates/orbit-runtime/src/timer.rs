//! Timer layer.
//!
//! Timers are ordinary registry events with a post hook, built entirely
//! on the public [`EventLoop`] API:
//!
//! ```text
//! set_interval(cb, 50ms)
//!   ├─ create_timer(repeat, 50ms) ── register "timer:<uuid>", arm
//!   └─ subscribe("timer:<uuid>", cb)
//!
//! armed sleep elapses ─► emit("timer:<uuid>")
//!   ├─ subscribers present: cb() then post(false)
//!   │     repeat → re-arm, keep          one-shot → unregister
//!   └─ no subscribers: post(true) → unregister
//! ```
//!
//! Clearing a timer only removes the subscriber. The event itself goes
//! away on its next firing, when it finds nobody subscribed.

use crate::event::Event;
use crate::event_loop::{Emitter, EventLoop};
use orbit_event::{Args, DispatchError, EventHooks, PostHook, Subscription};
use orbit_types::TimerId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::trace;

/// Prefix shared by every timer event id.
const TIMER_PREFIX: &str = "timer:";

struct TimerState {
    id: String,
    repeat: bool,
    delay: Duration,
    emitter: Emitter,
    runtime: Handle,
    armed: AtomicBool,
}

/// A self-rearming, self-unregistering event backed by a tokio sleep.
#[derive(Clone)]
pub struct TimerEvent {
    state: Arc<TimerState>,
}

impl TimerEvent {
    /// Creates an unarmed timer event with a fresh `timer:<uuid>` id.
    #[must_use]
    pub fn new(repeat: bool, delay: Duration, emitter: Emitter, runtime: Handle) -> Self {
        Self {
            state: Arc::new(TimerState {
                id: TimerId::new().to_string(),
                repeat,
                delay,
                emitter,
                runtime,
                armed: AtomicBool::new(false),
            }),
        }
    }

    /// `true` for intervals, `false` for one-shot timeouts.
    #[must_use]
    pub fn is_repeating(&self) -> bool {
        self.state.repeat
    }

    /// Configured delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.state.delay
    }

    /// Starts the countdown. No-op while a countdown is already pending.
    pub fn arm(&self) {
        Self::arm_state(&self.state);
    }

    fn arm_state(state: &Arc<TimerState>) {
        if state.armed.swap(true, Ordering::AcqRel) {
            return;
        }
        let state = Arc::clone(state);
        let runtime = state.runtime.clone();
        runtime.spawn(async move {
            tokio::time::sleep(state.delay).await;
            state.armed.store(false, Ordering::Release);
            trace!(timer = %state.id, "timer elapsed");
            state.emitter.emit(state.id.clone(), Args::new());
        });
    }
}

impl EventHooks for TimerEvent {
    fn id(&self) -> &str {
        &self.state.id
    }

    fn post(&self, subscribers_depleted: bool) -> Option<PostHook> {
        let state = Arc::clone(&self.state);
        Some(Box::new(move |_| {
            if subscribers_depleted || !state.repeat {
                return true;
            }
            TimerEvent::arm_state(&state);
            false
        }))
    }
}

impl fmt::Debug for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEvent")
            .field("id", &self.state.id)
            .field("repeat", &self.state.repeat)
            .field("delay", &self.state.delay)
            .finish_non_exhaustive()
    }
}

/// Identifies a timer subscription: the timer's event id plus the
/// subscriber position within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerHandle {
    pub event_id: String,
    pub index: usize,
}

impl EventLoop {
    /// Registers and arms a timer event with no subscribers.
    ///
    /// Delays below the configured minimum are raised to it. Returns the
    /// generated event id.
    pub fn create_timer(&self, repeat: bool, delay: Duration) -> Result<String, DispatchError> {
        let timer = self.new_timer(repeat, delay);
        let id = timer.id().to_owned();

        self.register_event(Event::Timer(timer.clone()), true)?;
        timer.arm();
        trace!(timer = %id, repeat, ?delay, "timer created");
        Ok(id)
    }

    fn new_timer(&self, repeat: bool, delay: Duration) -> TimerEvent {
        let delay = delay.max(self.min_timer_delay());
        TimerEvent::new(repeat, delay, self.emitter(), self.runtime_handle().clone())
    }

    /// Runs `subscription` once after `delay`.
    pub fn set_timeout(
        &self,
        subscription: Subscription,
        delay: Duration,
    ) -> Result<TimerHandle, DispatchError> {
        self.subscribe_timer(false, subscription, delay)
    }

    /// Runs `subscription` every `delay` until cleared.
    pub fn set_interval(
        &self,
        subscription: Subscription,
        delay: Duration,
    ) -> Result<TimerHandle, DispatchError> {
        self.subscribe_timer(true, subscription, delay)
    }

    fn subscribe_timer(
        &self,
        repeat: bool,
        subscription: Subscription,
        delay: Duration,
    ) -> Result<TimerHandle, DispatchError> {
        if self.in_dispatcher() {
            return self.install_timer(repeat, subscription, delay);
        }
        let el = self.clone();
        self.invoke(move || el.install_timer(repeat, subscription, delay))?
    }

    /// Registers, subscribes and arms in one dispatcher step, so the
    /// countdown cannot elapse before the subscriber is attached.
    fn install_timer(
        &self,
        repeat: bool,
        subscription: Subscription,
        delay: Duration,
    ) -> Result<TimerHandle, DispatchError> {
        let timer = self.new_timer(repeat, delay);
        let event_id = timer.id().to_owned();

        self.register_event(Event::Timer(timer.clone()), true)?;
        let index = self.subscribe(&event_id, subscription)?;
        timer.arm();
        trace!(timer = %event_id, repeat, ?delay, "timer subscribed");
        Ok(TimerHandle { event_id, index })
    }

    /// Cancels a pending timeout.
    pub fn clear_timeout(&self, handle: &TimerHandle) -> Result<(), DispatchError> {
        let index = i64::try_from(handle.index).unwrap_or(i64::MAX);
        self.unsubscribe(&handle.event_id, index)
    }

    /// Cancels an interval.
    pub fn clear_interval(&self, handle: &TimerHandle) -> Result<(), DispatchError> {
        self.clear_timeout(handle)
    }

    /// Number of timer events still registered.
    ///
    /// A timer stays registered until its final firing, so zero means no
    /// timer callback can run anymore.
    #[must_use]
    pub fn active_timers(&self) -> usize {
        self.event_names()
            .iter()
            .filter(|name| name.starts_with(TIMER_PREFIX))
            .count()
    }
}

//! Registered event variants.

use crate::timer::TimerEvent;
use orbit_event::{EventHooks, PostHook, PreHook, SimpleEvent, TransformEvent};
use std::fmt;
use std::sync::Arc;

/// Any event the registry can hold.
///
/// The dispatcher only talks to events through [`EventHooks`]; this enum
/// exists so the built-in variants stay concrete while hosts can still
/// plug in their own behaviour through [`Event::Custom`].
#[derive(Clone)]
pub enum Event {
    /// Plain named pub/sub channel.
    Simple(SimpleEvent),
    /// Self-rearming, self-cleaning timer event.
    Timer(TimerEvent),
    /// Host-defined hooks.
    Custom(Arc<dyn EventHooks>),
}

impl Event {
    /// Wraps host-defined hooks.
    pub fn custom(hooks: impl EventHooks + 'static) -> Self {
        Self::Custom(Arc::new(hooks))
    }

    fn hooks(&self) -> &dyn EventHooks {
        match self {
            Self::Simple(e) => e,
            Self::Timer(e) => e,
            Self::Custom(e) => e.as_ref(),
        }
    }
}

impl EventHooks for Event {
    fn id(&self) -> &str {
        self.hooks().id()
    }

    fn pre(&self, subscribers_depleted: bool) -> Option<PreHook> {
        self.hooks().pre(subscribers_depleted)
    }

    fn post(&self, subscribers_depleted: bool) -> Option<PostHook> {
        self.hooks().post(subscribers_depleted)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(e) => f.debug_tuple("Simple").field(&e.id()).finish(),
            Self::Timer(e) => f.debug_tuple("Timer").field(&e.id()).finish(),
            Self::Custom(e) => f.debug_tuple("Custom").field(&e.id()).finish(),
        }
    }
}

impl From<SimpleEvent> for Event {
    fn from(event: SimpleEvent) -> Self {
        Self::Simple(event)
    }
}

impl From<&str> for Event {
    fn from(id: &str) -> Self {
        Self::Simple(SimpleEvent::new(id))
    }
}

impl From<String> for Event {
    fn from(id: String) -> Self {
        Self::Simple(SimpleEvent::new(id))
    }
}

impl From<TimerEvent> for Event {
    fn from(event: TimerEvent) -> Self {
        Self::Timer(event)
    }
}

impl From<TransformEvent> for Event {
    fn from(event: TransformEvent) -> Self {
        Self::custom(event)
    }
}

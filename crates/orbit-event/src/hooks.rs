//! Event capability contract and the host-side event variants.
//!
//! Every registered event answers three questions:
//!
//! | Operation | Meaning |
//! |-----------|---------|
//! | [`EventHooks::id`] | registry key, fixed for the event's lifetime |
//! | [`EventHooks::pre`] | optional argument transform run before each subscriber |
//! | [`EventHooks::post`] | optional check run after each subscriber; `true` unregisters the event |
//!
//! Both hooks receive `subscribers_depleted`, which is `true` when the
//! event is fired while nobody is subscribed. That lets self-cleaning
//! events (timers) decide to go away once their last subscriber is gone.

use crate::subscription::{Args, Value};
use std::fmt;
use std::sync::Arc;

/// Argument transform returned by [`EventHooks::pre`].
pub type PreHook = Box<dyn FnOnce(Args) -> Args + Send>;

/// Post-dispatch check returned by [`EventHooks::post`].
///
/// Returns `true` when the event should be removed from the registry
/// after the current emission round.
pub type PostHook = Box<dyn FnOnce(&[Value]) -> bool + Send>;

/// Capability interface implemented by every event variant.
pub trait EventHooks: Send + Sync {
    /// Stable registry key.
    fn id(&self) -> &str;

    /// Hook run before dispatching to one subscriber.
    fn pre(&self, subscribers_depleted: bool) -> Option<PreHook> {
        let _ = subscribers_depleted;
        None
    }

    /// Hook run after dispatching to one subscriber.
    fn post(&self, subscribers_depleted: bool) -> Option<PostHook> {
        let _ = subscribers_depleted;
        None
    }
}

/// A plain named pub/sub channel. Has no hooks and never removes itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleEvent(String);

impl SimpleEvent {
    /// Creates a simple event with the given name.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for SimpleEvent {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl EventHooks for SimpleEvent {
    fn id(&self) -> &str {
        &self.0
    }
}

/// An event whose arguments are rewritten before reaching each subscriber.
///
/// The transform sees the arguments chosen for that subscriber (explicit
/// emission arguments, or the subscriber's defaults) and returns what the
/// callback actually receives. It is not run when nobody is subscribed.
///
/// ```
/// use orbit_event::{EventHooks, TransformEvent};
/// use serde_json::json;
///
/// let event = TransformEvent::new("sampleEvent", |mut args| {
///     args.insert(0, json!("from host"));
///     args
/// });
///
/// let pre = event.pre(false).expect("transform hook");
/// assert_eq!(pre(vec![json!(1)]), vec![json!("from host"), json!(1)]);
/// assert!(event.post(false).is_none());
/// ```
#[derive(Clone)]
pub struct TransformEvent {
    id: String,
    transform: Arc<dyn Fn(Args) -> Args + Send + Sync>,
}

impl TransformEvent {
    /// Creates a transform event.
    pub fn new<F>(id: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Args) -> Args + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            transform: Arc::new(transform),
        }
    }
}

impl fmt::Debug for TransformEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformEvent")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl EventHooks for TransformEvent {
    fn id(&self) -> &str {
        &self.id
    }

    fn pre(&self, subscribers_depleted: bool) -> Option<PreHook> {
        if subscribers_depleted {
            return None;
        }
        let transform = Arc::clone(&self.transform);
        Some(Box::new(move |args| transform(args)))
    }
}

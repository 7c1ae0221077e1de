//! Event registry.
//!
//! Maps event names to their [`EventSubscription`]. Owned exclusively by
//! the dispatcher thread (see [`crate::context`]); other threads only see
//! the read-only [`RegistryView`], which is republished after every
//! mutation.

use crate::event::Event;
use orbit_event::{DispatchError, EventHooks, Subscription};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// An event together with its ordered subscriber list.
#[derive(Debug, Clone)]
pub struct EventSubscription {
    event: Event,
    subscribers: Vec<Subscription>,
}

impl EventSubscription {
    fn new(event: Event) -> Self {
        Self {
            event,
            subscribers: Vec::new(),
        }
    }

    /// The registered event.
    #[must_use]
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Current subscribers, in subscription order.
    #[must_use]
    pub fn subscribers(&self) -> &[Subscription] {
        &self.subscribers
    }
}

/// Thread-safe, read-only view of registered names and subscriber counts.
///
/// Reads never touch the dispatcher, so answers may lag behind messages
/// that are still queued.
#[derive(Debug, Clone, Default)]
pub struct RegistryView {
    counts: Arc<RwLock<HashMap<String, usize>>>,
}

impl RegistryView {
    /// Returns `true` if `name` is currently registered.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.counts.read().contains_key(name)
    }

    /// Number of subscribers of `name`, or `None` if it is not registered.
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> Option<usize> {
        self.counts.read().get(name).copied()
    }

    /// Registered event names, sorted.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.counts.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn publish(&self, name: &str, count: usize) {
        self.counts.write().insert(name.to_owned(), count);
    }

    fn retract(&self, name: &str) {
        self.counts.write().remove(name);
    }
}

/// Name → subscription map.
#[derive(Debug)]
pub(crate) struct Registry {
    entries: HashMap<String, EventSubscription>,
    view: RegistryView,
}

impl Registry {
    pub(crate) fn new(view: RegistryView) -> Self {
        Self {
            entries: HashMap::new(),
            view,
        }
    }

    /// Inserts `event` if its id is free.
    ///
    /// Returns `false` (and leaves the existing entry untouched) when the
    /// id is already registered.
    pub(crate) fn register(&mut self, event: Event) -> bool {
        let id = event.id().to_owned();
        if self.entries.contains_key(&id) {
            return false;
        }
        self.view.publish(&id, 0);
        self.entries.insert(id, EventSubscription::new(event));
        true
    }

    /// Appends a subscriber and returns its position.
    pub(crate) fn subscribe(
        &mut self,
        name: &str,
        subscription: Subscription,
    ) -> Result<usize, DispatchError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| DispatchError::NotFound(name.to_owned()))?;
        entry.subscribers.push(subscription);
        let len = entry.subscribers.len();
        self.view.publish(name, len);
        Ok(len - 1)
    }

    /// Removes the subscriber at `index`, shifting later ones down.
    ///
    /// The event itself stays registered even when its last subscriber goes.
    pub(crate) fn unsubscribe(&mut self, name: &str, index: i64) -> Result<(), DispatchError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| DispatchError::NotFound(name.to_owned()))?;
        let len = entry.subscribers.len();
        let position = usize::try_from(index)
            .ok()
            .filter(|&i| i < len)
            .ok_or_else(|| DispatchError::out_of_range(name, index, len))?;
        entry.subscribers.remove(position);
        self.view.publish(name, len - 1);
        Ok(())
    }

    /// Removes the whole entry.
    pub(crate) fn remove(&mut self, name: &str) -> Option<EventSubscription> {
        let removed = self.entries.remove(name);
        if removed.is_some() {
            self.view.retract(name);
        }
        removed
    }

    /// Copies out the event and its current subscribers for one emission.
    ///
    /// The dispatcher iterates the copy so callbacks can subscribe and
    /// unsubscribe freely; changes apply from the next emission on.
    pub(crate) fn snapshot(&self, name: &str) -> Option<EventSubscription> {
        self.entries.get(name).cloned()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

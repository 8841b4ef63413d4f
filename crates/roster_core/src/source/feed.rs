//! In-process change feed with scoped subscriptions.
//!
//! # Invariants
//! - Versions start at 1 and increase by one per published event.
//! - Listeners see events in version order, in registration order.
//! - A listener is removed when its [`Subscription`] is dropped.
//! - Listeners must not call back into the feed that invokes them.

use crate::model::event::{ChangeEvent, VersionedEvent};
use log::debug;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback invoked for every published event.
pub type ChangeListener = Box<dyn Fn(&VersionedEvent) + Send>;

#[derive(Default)]
struct FeedInner {
    next_listener_id: u64,
    last_version: u64,
    listeners: BTreeMap<u64, ChangeListener>,
}

/// Shared change feed; clones publish to the same listeners.
#[derive(Clone, Default)]
pub struct ChangeFeed {
    inner: Arc<Mutex<FeedInner>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` and returns its scoped handle.
    pub fn subscribe(&self, listener: ChangeListener) -> Subscription {
        let mut inner = lock(&self.inner);
        inner.next_listener_id += 1;
        let listener_id = inner.next_listener_id;
        inner.listeners.insert(listener_id, listener);
        debug!(
            "event=feed_subscribe module=source status=ok listener_id={} listeners={}",
            listener_id,
            inner.listeners.len()
        );
        Subscription {
            feed: Arc::downgrade(&self.inner),
            listener_id,
        }
    }

    /// Stamps `event` with the next version and delivers it.
    ///
    /// Returns the assigned version.
    pub fn publish(&self, event: ChangeEvent) -> u64 {
        let mut inner = lock(&self.inner);
        inner.last_version += 1;
        let versioned = VersionedEvent::new(inner.last_version, event);
        for listener in inner.listeners.values() {
            listener(&versioned);
        }
        debug!(
            "event=feed_publish module=source status=ok version={} kind={} listeners={}",
            versioned.version,
            versioned.event.kind().as_str(),
            inner.listeners.len()
        );
        versioned.version
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    /// Returns the version of the last published event, `0` when none.
    pub fn last_version(&self) -> u64 {
        lock(&self.inner).last_version
    }
}

impl Debug for ChangeFeed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("ChangeFeed")
            .field("listeners", &inner.listeners.len())
            .field("last_version", &inner.last_version)
            .finish()
    }
}

/// Scoped registration handle. Dropping it unsubscribes the listener.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    feed: Weak<Mutex<FeedInner>>,
    listener_id: u64,
}

impl Subscription {
    /// Returns whether the listener is still registered with a live feed.
    pub fn is_active(&self) -> bool {
        let Some(inner) = self.feed.upgrade() else {
            return false;
        };
        let registered = lock(&inner).listeners.contains_key(&self.listener_id);
        registered
    }

    /// Unsubscribes explicitly. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.feed.upgrade() else {
            return;
        };
        let removed = lock(&inner).listeners.remove(&self.listener_id).is_some();
        debug!(
            "event=feed_unsubscribe module=source status={} listener_id={}",
            if removed { "ok" } else { "noop" },
            self.listener_id
        );
    }
}

fn lock(inner: &Mutex<FeedInner>) -> MutexGuard<'_, FeedInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

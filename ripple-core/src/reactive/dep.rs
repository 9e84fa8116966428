//! Dependency Implementation
//!
//! A Dependency is the publish/subscribe channel attached to one observable
//! slot: a reactive field, or the collection-level channel of an observed
//! object or list.
//!
//! # How Dependencies Work
//!
//! 1. When a slot is read while a subscriber is collecting, the slot calls
//!    [`Dependency::depend`], which hands the dependency to the subscriber.
//!    The subscriber decides whether it is new and, if so, calls back into
//!    [`Dependency::add_sub`].
//!
//! 2. When the slot changes, [`Dependency::notify`] calls `update` on every
//!    subscriber in the set.
//!
//! # Memory Layout
//!
//! Subscribers are held weakly. A subscriber keeps its dependencies alive
//! (it needs them for teardown), so a strong edge in the other direction
//! would form a cycle. Entries whose subscriber is gone are pruned on the
//! next notify.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::trace;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};

/// Counter for generating unique dependency IDs.
static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        Self(DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A notification channel bound to one observable slot or container.
///
/// Cloning a `Dependency` yields another handle to the same channel.
#[derive(Clone)]
pub struct Dependency {
    inner: Arc<DepInner>,
}

struct DepInner {
    id: DepId,

    /// Subscribers in registration order.
    subscribers: RwLock<IndexMap<SubscriberId, Weak<dyn Subscriber>>>,
}

impl Dependency {
    /// Create a new dependency with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DepInner {
                id: DepId::next(),
                subscribers: RwLock::new(IndexMap::new()),
            }),
        }
    }

    /// Get the dependency's unique ID.
    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Add a subscriber. Adding the same subscriber twice is a no-op.
    pub fn add_sub(&self, subscriber: &Arc<dyn Subscriber>) {
        self.inner
            .subscribers
            .write()
            .entry(subscriber.id())
            .or_insert_with(|| Arc::downgrade(subscriber));
    }

    /// Remove a subscriber.
    pub fn remove_sub(&self, subscriber_id: SubscriberId) {
        self.inner.subscribers.write().shift_remove(&subscriber_id);
    }

    /// Register this dependency with the active subscriber, if there is one.
    pub fn depend(&self) {
        if let Some(target) = ReactiveContext::current() {
            target.add_dep(self);
        }
    }

    /// Deliver a change signal to every current subscriber.
    ///
    /// The subscriber list is snapshotted first, so subscribers may
    /// re-subscribe or unsubscribe while being updated.
    pub fn notify(&self) {
        let mut subscribers: Vec<Arc<dyn Subscriber>> = {
            let mut guard = self.inner.subscribers.write();
            guard.retain(|_, sub| sub.strong_count() > 0);
            guard.values().filter_map(Weak::upgrade).collect()
        };

        if Runtime::config().ordered_notify {
            subscribers.sort_by_key(|sub| sub.id());
        }

        trace!(dep = self.id().raw(), subscribers = subscribers.len(), "notify");

        for subscriber in subscribers {
            subscriber.update();
        }
    }

    /// Get the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .values()
            .filter(|sub| sub.strong_count() > 0)
            .count()
    }

    /// Check whether the given subscriber is registered.
    pub fn has_subscriber(&self, subscriber_id: SubscriberId) -> bool {
        self.inner.subscribers.read().contains_key(&subscriber_id)
    }

    /// Check whether two handles refer to the same channel.
    pub fn ptr_eq(&self, other: &Dependency) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Dependency {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependency")
            .field("id", &self.inner.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    /// Records updates into a shared log and subscribes itself on `add_dep`.
    struct Recorder {
        id: SubscriberId,
        this: Weak<Recorder>,
        updates: AtomicUsize,
        log: Arc<Mutex<Vec<SubscriberId>>>,
    }

    impl Recorder {
        fn new(log: &Arc<Mutex<Vec<SubscriberId>>>) -> Arc<Self> {
            Arc::new_cyclic(|this| Self {
                id: SubscriberId::new(),
                this: this.clone(),
                updates: AtomicUsize::new(0),
                log: Arc::clone(log),
            })
        }

        fn as_dyn(self: &Arc<Self>) -> Arc<dyn Subscriber> {
            self.clone()
        }
    }

    impl Subscriber for Recorder {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn add_dep(&self, dep: &Dependency) {
            if let Some(this) = self.this.upgrade() {
                let this: Arc<dyn Subscriber> = this;
                dep.add_sub(&this);
            }
        }

        fn update(&self) {
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.log.lock().push(self.id);
        }
    }

    #[test]
    fn notify_reaches_every_subscriber() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dep = Dependency::new();
        let a = Recorder::new(&log);
        let b = Recorder::new(&log);

        dep.add_sub(&a.as_dyn());
        dep.add_sub(&b.as_dyn());
        dep.notify();

        assert_eq!(a.updates.load(Ordering::SeqCst), 1);
        assert_eq!(b.updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_subscription_is_ignored() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dep = Dependency::new();
        let a = Recorder::new(&log);

        dep.add_sub(&a.as_dyn());
        dep.add_sub(&a.as_dyn());
        assert_eq!(dep.subscriber_count(), 1);

        dep.notify();
        assert_eq!(a.updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn depend_registers_active_subscriber() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dep = Dependency::new();
        let a = Recorder::new(&log);

        dep.depend();
        assert_eq!(dep.subscriber_count(), 0);

        {
            let _ctx = ReactiveContext::enter(Some(a.as_dyn()));
            dep.depend();
        }
        assert!(dep.has_subscriber(a.id));
    }

    #[test]
    fn remove_sub_stops_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dep = Dependency::new();
        let a = Recorder::new(&log);

        dep.add_sub(&a.as_dyn());
        dep.remove_sub(a.id);
        dep.notify();

        assert_eq!(a.updates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dep = Dependency::new();
        {
            let a = Recorder::new(&log);
            dep.add_sub(&a.as_dyn());
            assert_eq!(dep.subscriber_count(), 1);
        }
        assert_eq!(dep.subscriber_count(), 0);
        dep.notify();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn ordered_notify_sorts_by_creation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dep = Dependency::new();
        let first = Recorder::new(&log);
        let second = Recorder::new(&log);

        Runtime::configure(|cfg| cfg.ordered_notify = true);
        dep.add_sub(&second.as_dyn());
        dep.add_sub(&first.as_dyn());
        dep.notify();

        assert_eq!(*log.lock(), vec![first.id, second.id]);
    }

    #[test]
    fn insertion_order_without_sorting() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dep = Dependency::new();
        let first = Recorder::new(&log);
        let second = Recorder::new(&log);

        Runtime::configure(|cfg| cfg.ordered_notify = false);
        dep.add_sub(&second.as_dyn());
        dep.add_sub(&first.as_dyn());
        dep.notify();

        assert_eq!(*log.lock(), vec![second.id, first.id]);
    }

    #[test]
    fn dependency_ids_are_unique() {
        let a = Dependency::new();
        let b = Dependency::new();
        assert_ne!(a.id(), b.id());
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }
}

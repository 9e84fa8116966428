//! Subscriber types for the reactive system.
//!
//! A Subscriber represents any computation that depends on reactive values.
//! Watchers (render effects, computed properties, user watches) are the
//! production implementation; tests plug in their own.

use std::sync::atomic::{AtomicU64, Ordering};

use super::dep::Dependency;

/// Unique identifier for a subscriber.
///
/// Ids are handed out in creation order, so sorting by id puts parents
/// (created first) ahead of their children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that can be registered with a [`Dependency`].
///
/// Dependencies hold subscribers weakly and call [`Subscriber::update`] when
/// they change. While a subscriber is on top of the active stack, every
/// dependency read calls [`Subscriber::add_dep`] on it.
pub trait Subscriber: Send + Sync {
    /// The subscriber's unique ID.
    fn id(&self) -> SubscriberId;

    /// Record that `dep` was read during the current evaluation.
    ///
    /// Implementations are expected to subscribe themselves to `dep` the
    /// first time it is seen.
    fn add_dep(&self, dep: &Dependency);

    /// A dependency changed.
    fn update(&self);
}

//! Observed Values
//!
//! An [`ObservedValue`] is the state attached to a container once it has
//! been made reactive. It carries the container's collection-level
//! [`Dependency`], which fires when fields are added or removed or when a
//! list is mutated through one of its intercepted operations, and a root
//! count recording how many owning instances use the container as their
//! root data.
//!
//! # Observation
//!
//! [`observe`] is the only way an `ObservedValue` comes into existence.
//! It attaches the marker to the container *before* walking its contents,
//! so a container that (directly or indirectly) contains itself is wrapped
//! exactly once and the walk terminates.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

use super::array::Array;
use super::define::define_reactive;
use super::object::Object;
use super::value::Value;
use crate::reactive::{Dependency, Runtime};

/// Reactive state attached to an observed container.
#[derive(Clone)]
pub struct ObservedValue {
    inner: Arc<ObservedInner>,
}

struct ObservedInner {
    dep: Dependency,
    root_count: AtomicUsize,
}

impl ObservedValue {
    fn new() -> Self {
        Self {
            inner: Arc::new(ObservedInner {
                dep: Dependency::new(),
                root_count: AtomicUsize::new(0),
            }),
        }
    }

    /// The collection-level dependency.
    pub fn dep(&self) -> &Dependency {
        &self.inner.dep
    }

    /// How many owning instances use this container as root data.
    pub fn root_count(&self) -> usize {
        self.inner.root_count.load(Ordering::SeqCst)
    }

    pub(crate) fn add_root(&self) {
        self.inner.root_count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn remove_root(&self) {
        let _ = self
            .inner
            .root_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn ptr_eq(&self, other: &ObservedValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ObservedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedValue")
            .field("dep", &self.inner.dep.id())
            .field("root_count", &self.root_count())
            .finish()
    }
}

/// Make a container reactive, returning its observer.
///
/// Returns `None` for primitives and opaque host values, and for containers
/// that are not yet observed but may not be: observation is switched off,
/// the container is an instance scope, or it is not extensible. A container
/// that already carries an observer returns that observer.
///
/// `as_root` increments the observer's root count.
pub fn observe(value: &Value, as_root: bool) -> Option<ObservedValue> {
    let observer = match value {
        Value::Object(obj) => observe_object(obj),
        Value::Array(items) => observe_array(items),
        _ => None,
    }?;
    if as_root {
        observer.add_root();
    }
    Some(observer)
}

fn observe_object(obj: &Object) -> Option<ObservedValue> {
    if let Some(existing) = obj.observer() {
        return Some(existing);
    }
    if !Runtime::should_observe() || obj.is_instance() || !obj.is_extensible() {
        return None;
    }

    let observer = ObservedValue::new();
    if !obj.attach_observer(observer.clone()) {
        return obj.observer();
    }
    trace!(dep = observer.dep().id().raw(), "observe object");

    for key in obj.keys() {
        define_reactive(obj, &key, None, None, false);
    }
    Some(observer)
}

fn observe_array(items: &Array) -> Option<ObservedValue> {
    if let Some(existing) = items.observer() {
        return Some(existing);
    }
    if !Runtime::should_observe() || !items.is_extensible() {
        return None;
    }

    let observer = ObservedValue::new();
    if !items.attach_observer(observer.clone()) {
        return items.observer();
    }
    trace!(dep = observer.dep().id().raw(), len = items.len(), "observe list");

    observe_items(&items.to_vec());
    Some(observer)
}

/// Observe every element of a slice.
pub(crate) fn observe_items(items: &[Value]) {
    for item in items {
        observe(item, false);
    }
}

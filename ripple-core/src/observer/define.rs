//! Reactive Fields
//!
//! [`define_reactive`] replaces one field of an [`Object`] with an accessor
//! pair backed by a per-field [`Dependency`].
//!
//! # Reads
//!
//! While a subscriber is collecting, a read registers the field's
//! dependency and, if the field holds an observed container, that
//! container's collection-level dependency as well. A list additionally
//! registers the collection dependency of every element, recursively,
//! because element reads cannot be intercepted.
//!
//! # Writes
//!
//! A write of a value that is [`same_value`](Value::same_value) as the
//! current one does nothing. Otherwise the new value is stored, observed
//! (refreshing the cached child observer) and the field's dependency is
//! notified.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use super::array::Array;
use super::object::{Getter, Object, Property, Setter};
use super::observed::{observe, ObservedValue};
use super::value::Value;
use crate::reactive::{Dependency, ReactiveContext, Runtime};

/// Side-channel invoked before a reactive field accepts a new value.
///
/// Skipped entirely in production mode.
pub type CustomSetter = Arc<dyn Fn() + Send + Sync>;

struct ReactiveField {
    dep: Dependency,

    /// Accessors the field had before it was made reactive.
    getter: Option<Getter>,
    setter: Option<Setter>,

    /// Storage when there is no preserved getter.
    value: RwLock<Value>,

    /// Observer of the current value, if it is an observed container.
    child: RwLock<Option<ObservedValue>>,

    custom_setter: Option<CustomSetter>,
    shallow: bool,
}

impl ReactiveField {
    fn current(&self, obj: &Object) -> Value {
        match &self.getter {
            Some(get) => get(obj),
            None => self.value.read().clone(),
        }
    }

    fn read(&self, obj: &Object) -> Value {
        let value = self.current(obj);
        if ReactiveContext::is_active() {
            self.dep.depend();
            let child = self.child.read().clone();
            if let Some(child) = child {
                child.dep().depend();
                if let Value::Array(items) = &value {
                    depend_array(items);
                }
            }
        }
        value
    }

    fn write(&self, obj: &Object, new_value: Value) {
        let current = self.current(obj);
        if new_value.same_value(&current) {
            return;
        }
        if let Some(hook) = &self.custom_setter {
            if !Runtime::config().production {
                hook();
            }
        }
        if self.getter.is_some() && self.setter.is_none() {
            return;
        }
        match &self.setter {
            Some(set) => set(obj, new_value.clone()),
            None => *self.value.write() = new_value.clone(),
        }
        *self.child.write() = if self.shallow {
            None
        } else {
            observe(&new_value, false)
        };
        self.dep.notify();
    }
}

/// Turn `key` on `obj` into a reactive field.
///
/// `value` seeds the field; when `None`, the field's current value is read
/// unless it has a getter and no setter. Non-configurable fields are left
/// alone. `shallow` skips observation of the stored value.
///
/// Returns `false` if the field was left as it was.
pub fn define_reactive(
    obj: &Object,
    key: &str,
    value: Option<Value>,
    custom_setter: Option<CustomSetter>,
    shallow: bool,
) -> bool {
    let existing = obj.own_property(key);
    if existing.as_ref().is_some_and(|prop| !prop.configurable) {
        return false;
    }

    let getter = existing.as_ref().and_then(|prop| prop.getter().cloned());
    let setter = existing.as_ref().and_then(|prop| prop.setter().cloned());

    let value = match value {
        Some(value) => value,
        None if getter.is_none() || setter.is_some() => obj.get(key),
        None => Value::Undefined,
    };
    let child = if shallow { None } else { observe(&value, false) };

    let field = Arc::new(ReactiveField {
        dep: Dependency::new(),
        getter,
        setter,
        value: RwLock::new(value),
        child: RwLock::new(child),
        custom_setter,
        shallow,
    });

    let reader = Arc::clone(&field);
    let writer = field;
    let property = Property::accessor(
        Some(Arc::new(move |obj: &Object| reader.read(obj))),
        Some(Arc::new(move |obj: &Object, value: Value| writer.write(obj, value))),
    );

    match obj.define_property(key, property) {
        Ok(()) => true,
        Err(err) => {
            Runtime::warn(&format!("Cannot make \"{key}\" reactive: {err}"), Some(obj));
            false
        }
    }
}

/// Register the collection dependency of every element of a list, and of
/// nested lists, with the active subscriber.
pub fn depend_array(items: &Array) {
    let mut visited = HashSet::new();
    depend_items(items, &mut visited);
}

fn depend_items(items: &Array, visited: &mut HashSet<usize>) {
    if !visited.insert(items.addr()) {
        return;
    }
    for item in items.to_vec() {
        if let Some(observer) = item.observer() {
            observer.dep().depend();
        }
        if let Value::Array(nested) = &item {
            depend_items(nested, visited);
        }
    }
}

//! Mutation Gateway
//!
//! [`set`] and [`del`] add and remove members that the field accessors
//! cannot see, keeping the result reactive. A field added to an observed
//! object becomes a reactive field, and the object's collection dependency
//! fires so that anything depending on its shape re-runs. List writes go
//! through the intercepted [`Array::splice`](super::Array::splice).
//!
//! Misuse is never fatal. Each refused operation reports a warning through
//! [`Runtime::warn`] and returns normally.

use std::fmt;

use super::array::MAX_LEN;
use super::define::define_reactive;
use super::object::Object;
use super::value::Value;
use crate::reactive::Runtime;

/// Member name or list index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl Key {
    /// The key as a list index, if it is one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Name(name) => name.parse().ok(),
        }
    }

    /// The key as a field name.
    pub fn to_name(&self) -> String {
        match self {
            Key::Index(index) => index.to_string(),
            Key::Name(name) => name.clone(),
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

/// Assign a member, adding it as a reactive field if it is new.
///
/// Returns `value`.
pub fn set(target: &Value, key: impl Into<Key>, value: Value) -> Value {
    let key = key.into();
    match target {
        Value::Array(items) => {
            match key.as_index() {
                Some(index) if index >= MAX_LEN => Runtime::warn(
                    &format!(
                        "Cannot set list index {index}: lists hold at most {MAX_LEN} elements."
                    ),
                    None,
                ),
                Some(index) => {
                    if index > items.len() {
                        if let Err(err) = items.set_len(index) {
                            Runtime::warn(&format!("Cannot set list index {index}: {err}"), None);
                            return value;
                        }
                    }
                    items.splice(index, 1, [value.clone()]);
                }
                None => Runtime::warn(
                    &format!("Cannot set non-index key \"{key}\" on a list."),
                    None,
                ),
            }
            value
        }
        Value::Object(obj) => {
            set_field(obj, &key.to_name(), value.clone());
            value
        }
        other => {
            Runtime::warn(
                &format!(
                    "Cannot set reactive property on undefined, null, or primitive value: {}",
                    other.type_name()
                ),
                None,
            );
            value
        }
    }
}

fn set_field(obj: &Object, key: &str, value: Value) {
    if obj.has(key) {
        assign(obj, key, value);
        return;
    }

    let observer = obj.observer();
    if obj.is_instance() || observer.as_ref().is_some_and(|ob| ob.root_count() > 0) {
        Runtime::warn(
            "Avoid adding reactive properties to an instance or its root data at runtime - \
             declare it upfront in the data option.",
            Some(obj),
        );
        if !obj.is_instance() {
            assign(obj, key, value);
        }
        return;
    }

    match observer {
        Some(observer) => {
            if define_reactive(obj, key, Some(value), None, false) {
                observer.dep().notify();
            }
        }
        None => assign(obj, key, value),
    }
}

fn assign(obj: &Object, key: &str, value: Value) {
    if let Err(err) = obj.set(key, value) {
        Runtime::warn(&format!("Cannot assign \"{key}\": {err}"), Some(obj));
    }
}

/// Remove a member and notify dependents of the container's shape.
pub fn del(target: &Value, key: impl Into<Key>) {
    let key = key.into();
    match target {
        Value::Array(items) => match key.as_index() {
            Some(index) => {
                items.splice(index, 1, []);
            }
            None => Runtime::warn(
                &format!("Cannot delete non-index key \"{key}\" on a list."),
                None,
            ),
        },
        Value::Object(obj) => delete_field(obj, &key.to_name()),
        other => Runtime::warn(
            &format!(
                "Cannot delete reactive property on undefined, null, or primitive value: {}",
                other.type_name()
            ),
            None,
        ),
    }
}

fn delete_field(obj: &Object, key: &str) {
    let observer = obj.observer();
    if obj.is_instance() || observer.as_ref().is_some_and(|ob| ob.root_count() > 0) {
        Runtime::warn(
            "Avoid deleting properties on an instance or its root data - just set it to null.",
            Some(obj),
        );
        return;
    }
    if !obj.has_own(key) {
        return;
    }
    if let Err(err) = obj.remove(key) {
        Runtime::warn(&format!("Cannot delete \"{key}\": {err}"), Some(obj));
        return;
    }
    if let Some(observer) = observer {
        observer.dep().notify();
    }
}

//! Ordered Lists
//!
//! An [`Array`] owns its storage and exposes the seven length/order-mutating
//! operations directly. Once the list is observed, each of them runs its
//! plain semantics, observes any newly inserted elements, and then notifies
//! the list's collection-level dependency, whether or not anything actually
//! moved.
//!
//! # Index Assignment
//!
//! [`Array::set_index`] writes an element in place *without* notification.
//! Element reads are not tracked either, so subscribers that care about
//! element identity rely on the collection dependency (registered by the
//! field holding the list) and on deep traversal. Reactive replacement goes
//! through [`set`](super::set), which uses [`Array::splice`].

use std::cmp::Ordering;
use std::collections::TryReserveError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::trace;

use super::observed::{observe_items, ObservedValue};
use super::value::Value;
use crate::error::ReactiveError;
use crate::reactive::Runtime;

/// Largest length a list may reach.
pub const MAX_LEN: usize = u32::MAX as usize;

/// An ordered list with reference identity.
#[derive(Clone)]
pub struct Array {
    inner: Arc<ArrayInner>,
}

struct ArrayInner {
    items: RwLock<Vec<Value>>,
    frozen: AtomicBool,
    observer: OnceLock<ObservedValue>,
}

impl Array {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Create a list that takes ownership of `items`.
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            inner: Arc::new(ArrayInner {
                items: RwLock::new(items),
                frozen: AtomicBool::new(false),
                observer: OnceLock::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, or `Undefined` past the end. Not tracked.
    pub fn get(&self, index: usize) -> Value {
        self.inner.items.read().get(index).cloned().unwrap_or_default()
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items.read().clone()
    }

    /// Write an element in place without notifying anyone.
    ///
    /// Writing past the end pads with `Undefined`. Indices at or beyond
    /// [`MAX_LEN`] and growth that cannot be allocated are refused with a
    /// warning.
    pub fn set_index(&self, index: usize, value: Value) {
        if !self.check_mutable("set_index") {
            return;
        }
        if index >= MAX_LEN {
            Runtime::warn(&format!("Invalid list index: {index}"), None);
            return;
        }
        let mut items = self.inner.items.write();
        if index >= items.len() {
            if let Err(err) = grow(&mut items, index + 1, 0) {
                Runtime::warn(&format!("Cannot grow list to {}: {err}", index + 1), None);
                return;
            }
        }
        items[index] = value;
    }

    /// Change the length without notifying anyone, padding with `Undefined`.
    ///
    /// Room for one more element is reserved, so an insertion right after
    /// growing does not reallocate. Lengths beyond [`MAX_LEN`] are refused.
    pub fn set_len(&self, len: usize) -> Result<(), ReactiveError> {
        if !self.check_mutable("set_len") {
            return Ok(());
        }
        if len > MAX_LEN {
            return Err(ReactiveError::InvalidLength(len));
        }
        let mut items = self.inner.items.write();
        grow(&mut items, len, 1).map_err(|err| ReactiveError::Other(Box::new(err)))?;
        items.truncate(len);
        Ok(())
    }

    /// Append elements. Returns the new length.
    pub fn push<I>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        let inserted: Vec<Value> = values.into_iter().collect();
        if !self.check_mutable("push") {
            return self.len();
        }
        let len = {
            let mut items = self.inner.items.write();
            items.extend(inserted.iter().cloned());
            items.len()
        };
        self.intercepted("push", &inserted);
        len
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Value {
        if !self.check_mutable("pop") {
            return Value::Undefined;
        }
        let removed = self.inner.items.write().pop().unwrap_or_default();
        self.intercepted("pop", &[]);
        removed
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Value {
        if !self.check_mutable("shift") {
            return Value::Undefined;
        }
        let removed = {
            let mut items = self.inner.items.write();
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        };
        self.intercepted("shift", &[]);
        removed
    }

    /// Prepend elements, keeping their order. Returns the new length.
    pub fn unshift<I>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        let inserted: Vec<Value> = values.into_iter().collect();
        if !self.check_mutable("unshift") {
            return self.len();
        }
        let len = {
            let mut items = self.inner.items.write();
            items.splice(0..0, inserted.iter().cloned());
            items.len()
        };
        self.intercepted("unshift", &inserted);
        len
    }

    /// Remove `delete_count` elements starting at `start` and insert
    /// `values` in their place. Both bounds are clamped to the list.
    /// Returns the removed elements.
    pub fn splice<I>(&self, start: usize, delete_count: usize, values: I) -> Vec<Value>
    where
        I: IntoIterator<Item = Value>,
    {
        let inserted: Vec<Value> = values.into_iter().collect();
        if !self.check_mutable("splice") {
            return Vec::new();
        }
        let removed = {
            let mut items = self.inner.items.write();
            let start = start.min(items.len());
            let end = start + delete_count.min(items.len() - start);
            items.splice(start..end, inserted.iter().cloned()).collect()
        };
        self.intercepted("splice", &inserted);
        removed
    }

    /// Sort in place with [`Value::sort_cmp`].
    pub fn sort(&self) {
        self.sort_by(Value::sort_cmp);
    }

    /// Sort in place with a comparator.
    ///
    /// The comparator runs without the list locked and sees the unsorted
    /// contents. Changes it makes to the list are overwritten by the result.
    pub fn sort_by<F>(&self, compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        if !self.check_mutable("sort") {
            return;
        }
        let mut items = self.to_vec();
        items.sort_by(compare);
        *self.inner.items.write() = items;
        self.intercepted("sort", &[]);
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        if !self.check_mutable("reverse") {
            return;
        }
        self.inner.items.write().reverse();
        self.intercepted("reverse", &[]);
    }

    /// Post-mutation hook shared by the intercepted operations.
    fn intercepted(&self, method: &'static str, inserted: &[Value]) {
        if let Some(observer) = self.observer() {
            trace!(method, inserted = inserted.len(), "list mutation");
            observe_items(inserted);
            observer.dep().notify();
        }
    }

    fn check_mutable(&self, method: &str) -> bool {
        if self.is_frozen() {
            Runtime::warn(&format!("Cannot call {method}() on a frozen list."), None);
            return false;
        }
        true
    }

    /// Forbid every mutation.
    pub fn freeze(&self) {
        self.inner.frozen.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(AtomicOrdering::SeqCst)
    }

    pub fn is_extensible(&self) -> bool {
        !self.is_frozen()
    }

    /// The observer attached to this list, if it has been observed.
    pub fn observer(&self) -> Option<ObservedValue> {
        self.inner.observer.get().cloned()
    }

    /// Attach an observer. Returns `false` if one was already attached.
    pub(crate) fn attach_observer(&self, observer: ObservedValue) -> bool {
        self.inner.observer.set(observer).is_ok()
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

/// Pad `items` with `Undefined` up to `len`, reserving `spare` extra slots.
/// Allocation failure is reported instead of aborting.
fn grow(items: &mut Vec<Value>, len: usize, spare: usize) -> Result<(), TryReserveError> {
    let wanted = len.saturating_add(spare);
    if wanted > items.len() {
        items.try_reserve(wanted - items.len())?;
    }
    if len > items.len() {
        items.resize(len, Value::Undefined);
    }
    Ok(())
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Into<Value>> FromIterator<V> for Array {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("len", &self.len())
            .field("observed", &self.observer().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(items: &Array) -> Vec<f64> {
        items.to_vec().iter().filter_map(Value::as_f64).collect()
    }

    #[test]
    fn push_and_pop() {
        let list: Array = [1, 2].into_iter().collect();
        assert_eq!(list.push([Value::from(3)]), 3);
        assert_eq!(list.pop(), Value::from(3));
        assert_eq!(nums(&list), vec![1.0, 2.0]);
    }

    #[test]
    fn shift_and_unshift() {
        let list: Array = [2, 3].into_iter().collect();
        assert_eq!(list.unshift([Value::from(0), Value::from(1)]), 4);
        assert_eq!(nums(&list), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(list.shift(), Value::from(0));
        assert_eq!(Array::new().shift(), Value::Undefined);
    }

    #[test]
    fn splice_replaces_range() {
        let list: Array = [1, 2, 3, 4].into_iter().collect();
        let removed = list.splice(1, 2, [Value::from(9)]);
        assert_eq!(removed, vec![Value::from(2), Value::from(3)]);
        assert_eq!(nums(&list), vec![1.0, 9.0, 4.0]);
    }

    #[test]
    fn splice_clamps_bounds() {
        let list: Array = [1, 2].into_iter().collect();
        assert!(list.splice(5, 3, [Value::from(3)]).is_empty());
        assert_eq!(nums(&list), vec![1.0, 2.0, 3.0]);
        assert_eq!(list.splice(1, 10, []).len(), 2);
        assert_eq!(nums(&list), vec![1.0]);
    }

    #[test]
    fn sort_and_reverse() {
        let list: Array = [3, 1, 2].into_iter().collect();
        list.sort();
        assert_eq!(nums(&list), vec![1.0, 2.0, 3.0]);
        list.reverse();
        assert_eq!(nums(&list), vec![3.0, 2.0, 1.0]);
        list.sort_by(|a, b| b.sort_cmp(a));
        assert_eq!(nums(&list), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn set_index_pads_with_undefined() {
        let list = Array::new();
        list.set_index(2, Value::from("x"));
        assert_eq!(list.to_vec(), vec![Value::Undefined, Value::Undefined, Value::from("x")]);
    }

    #[test]
    fn comparator_sees_unsorted_contents() {
        let list: Array = [3, 1, 2].into_iter().collect();
        let reader = list.clone();
        list.sort_by(|a, b| {
            assert_eq!(reader.len(), 3);
            a.sort_cmp(b)
        });
        assert_eq!(nums(&list), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn oversized_growth_is_refused() {
        Runtime::configure(|cfg| cfg.silent = true);
        let list: Array = [1].into_iter().collect();

        list.set_index(usize::MAX, Value::from(2));
        list.set_index(MAX_LEN, Value::from(2));
        assert!(matches!(
            list.set_len(MAX_LEN + 1),
            Err(ReactiveError::InvalidLength(_))
        ));
        assert_eq!(nums(&list), vec![1.0]);

        list.set_len(3).unwrap();
        assert_eq!(list.len(), 3);
        list.set_len(1).unwrap();
        assert_eq!(nums(&list), vec![1.0]);
    }

    #[test]
    fn frozen_lists_ignore_mutation() {
        let list: Array = [1].into_iter().collect();
        list.freeze();
        Runtime::configure(|cfg| cfg.silent = true);
        assert_eq!(list.push([Value::from(2)]), 1);
        assert_eq!(list.pop(), Value::Undefined);
        list.set_index(0, Value::from(5));
        assert_eq!(nums(&list), vec![1.0]);
    }
}

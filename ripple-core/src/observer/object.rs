//! Plain Structures
//!
//! An [`Object`] is a structure with named fields and reference identity.
//! Each field is described by a [`Property`]: either a stored value or an
//! accessor pair. Making a field reactive means replacing its property with
//! an accessor whose getter collects dependencies and whose setter notifies
//! them; see [`define_reactive`](super::define_reactive).
//!
//! Reads and writes release the property table lock before calling any
//! accessor, so accessors are free to read and write other fields (or the
//! same object) without deadlocking.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::observed::ObservedValue;
use super::value::Value;
use crate::error::ReactiveError;

/// Field read hook. Receives the object being read.
pub type Getter = Arc<dyn Fn(&Object) -> Value + Send + Sync>;

/// Field write hook. Receives the object being written and the new value.
pub type Setter = Arc<dyn Fn(&Object, Value) + Send + Sync>;

/// Storage behind a field.
#[derive(Clone)]
pub enum Slot {
    /// Stored value.
    Data { value: Value, writable: bool },
    /// Custom read/write logic.
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
    },
}

/// Descriptor of one field.
#[derive(Clone)]
pub struct Property {
    pub slot: Slot,
    pub enumerable: bool,
    pub configurable: bool,
}

impl Property {
    /// A writable, enumerable, configurable stored value.
    pub fn data(value: impl Into<Value>) -> Self {
        Self {
            slot: Slot::Data {
                value: value.into(),
                writable: true,
            },
            enumerable: true,
            configurable: true,
        }
    }

    /// An enumerable, configurable accessor pair.
    pub fn accessor(get: Option<Getter>, set: Option<Setter>) -> Self {
        Self {
            slot: Slot::Accessor { get, set },
            enumerable: true,
            configurable: true,
        }
    }

    /// Exclude the field from key enumeration.
    pub fn hidden(mut self) -> Self {
        self.enumerable = false;
        self
    }

    /// Forbid redefinition and removal.
    pub fn locked(mut self) -> Self {
        self.configurable = false;
        self
    }

    /// Forbid assignment to a stored value.
    pub fn read_only(mut self) -> Self {
        if let Slot::Data { writable, .. } = &mut self.slot {
            *writable = false;
        }
        self
    }

    pub fn getter(&self) -> Option<&Getter> {
        match &self.slot {
            Slot::Accessor { get, .. } => get.as_ref(),
            Slot::Data { .. } => None,
        }
    }

    pub fn setter(&self) -> Option<&Setter> {
        match &self.slot {
            Slot::Accessor { set, .. } => set.as_ref(),
            Slot::Data { .. } => None,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self.slot, Slot::Accessor { .. })
    }
}

/// A structure with named fields and reference identity.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

/// Non-owning handle to an [`Object`].
#[derive(Clone)]
pub struct WeakObject {
    inner: Weak<ObjectInner>,
}

struct ObjectInner {
    /// Own fields in insertion order.
    properties: RwLock<IndexMap<String, Property>>,

    /// Fallback for reads of missing keys.
    proto: Option<Object>,

    extensible: AtomicBool,

    /// Marks an owning instance scope, which is never observed.
    instance: bool,

    /// Attached on first observation.
    observer: OnceLock<ObservedValue>,
}

impl Object {
    /// Create an empty plain structure.
    pub fn new() -> Self {
        Self::build(None, false)
    }

    /// Create an empty plain structure whose missing keys fall back to `proto`.
    pub fn with_proto(proto: &Object) -> Self {
        Self::build(Some(proto.clone()), false)
    }

    /// Create an instance scope. Instance scopes are never observed and
    /// refuse structural additions through the mutation gateway.
    pub fn instance() -> Self {
        Self::build(None, true)
    }

    fn build(proto: Option<Object>, instance: bool) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                properties: RwLock::new(IndexMap::new()),
                proto,
                extensible: AtomicBool::new(true),
                instance,
                observer: OnceLock::new(),
            }),
        }
    }

    /// Find a property on this object or along its prototype chain.
    fn lookup(&self, key: &str) -> Option<Property> {
        let own = self.inner.properties.read().get(key).cloned();
        match own {
            Some(prop) => Some(prop),
            None => self.inner.proto.as_ref().and_then(|proto| proto.lookup(key)),
        }
    }

    /// Read a field. Missing fields read as `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        match self.lookup(key) {
            Some(Property {
                slot: Slot::Data { value, .. },
                ..
            }) => value,
            Some(Property {
                slot: Slot::Accessor { get: Some(get), .. },
                ..
            }) => get(self),
            _ => Value::Undefined,
        }
    }

    /// Assign a field.
    ///
    /// Accessors run their setter; stored values are replaced in place.
    /// A missing field becomes a new stored value if the object is
    /// extensible.
    pub fn set(&self, key: &str, value: Value) -> Result<(), ReactiveError> {
        match self.lookup(key) {
            Some(Property {
                slot: Slot::Accessor { set: Some(set), .. },
                ..
            }) => {
                set(self, value);
                Ok(())
            }
            Some(Property {
                slot: Slot::Accessor { set: None, .. },
                ..
            })
            | Some(Property {
                slot: Slot::Data {
                    writable: false, ..
                },
                ..
            }) => Err(ReactiveError::ReadOnly(key.to_string())),
            _ => {
                let mut properties = self.inner.properties.write();
                match properties.get_mut(key) {
                    Some(Property {
                        slot: Slot::Data { value: slot, .. },
                        ..
                    }) => {
                        *slot = value;
                        Ok(())
                    }
                    Some(_) => Err(ReactiveError::ReadOnly(key.to_string())),
                    None if self.is_extensible() => {
                        properties.insert(key.to_string(), Property::data(value));
                        Ok(())
                    }
                    None => Err(ReactiveError::NotExtensible(key.to_string())),
                }
            }
        }
    }

    /// Define or redefine an own field.
    ///
    /// Redefinition keeps the field's position in key order.
    pub fn define_property(&self, key: &str, property: Property) -> Result<(), ReactiveError> {
        let mut properties = self.inner.properties.write();
        match properties.get_mut(key) {
            Some(existing) if !existing.configurable => {
                Err(ReactiveError::NotConfigurable(key.to_string()))
            }
            Some(existing) => {
                *existing = property;
                Ok(())
            }
            None if self.is_extensible() => {
                properties.insert(key.to_string(), property);
                Ok(())
            }
            None => Err(ReactiveError::NotExtensible(key.to_string())),
        }
    }

    /// Descriptor of an own field.
    pub fn own_property(&self, key: &str) -> Option<Property> {
        self.inner.properties.read().get(key).cloned()
    }

    /// Remove an own field. Returns `Ok(false)` if there was none.
    pub fn remove(&self, key: &str) -> Result<bool, ReactiveError> {
        let mut properties = self.inner.properties.write();
        match properties.get(key) {
            None => Ok(false),
            Some(prop) if !prop.configurable => {
                Err(ReactiveError::NotConfigurable(key.to_string()))
            }
            Some(_) => {
                properties.shift_remove(key);
                Ok(true)
            }
        }
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.inner.properties.read().contains_key(key)
    }

    /// Own or inherited field.
    pub fn has(&self, key: &str) -> bool {
        self.has_own(key)
            || self
                .inner
                .proto
                .as_ref()
                .is_some_and(|proto| proto.has(key))
    }

    /// Enumerable own keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .properties
            .read()
            .iter()
            .filter(|(_, prop)| prop.enumerable)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of own fields, enumerable or not.
    pub fn len(&self) -> usize {
        self.inner.properties.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn proto(&self) -> Option<&Object> {
        self.inner.proto.as_ref()
    }

    pub fn is_instance(&self) -> bool {
        self.inner.instance
    }

    pub fn is_extensible(&self) -> bool {
        self.inner.extensible.load(Ordering::SeqCst)
    }

    /// Forbid new fields.
    pub fn prevent_extensions(&self) {
        self.inner.extensible.store(false, Ordering::SeqCst);
    }

    /// Forbid new fields, redefinition, removal, and writes to stored values.
    pub fn freeze(&self) {
        self.prevent_extensions();
        let mut properties = self.inner.properties.write();
        for prop in properties.values_mut() {
            prop.configurable = false;
            if let Slot::Data { writable, .. } = &mut prop.slot {
                *writable = false;
            }
        }
    }

    pub fn is_frozen(&self) -> bool {
        !self.is_extensible()
            && self.inner.properties.read().values().all(|prop| {
                !prop.configurable
                    && match prop.slot {
                        Slot::Data { writable, .. } => !writable,
                        Slot::Accessor { .. } => true,
                    }
            })
    }

    /// The observer attached to this object, if it has been observed.
    pub fn observer(&self) -> Option<ObservedValue> {
        self.inner.observer.get().cloned()
    }

    /// Attach an observer. Returns `false` if one was already attached.
    pub(crate) fn attach_observer(&self, observer: ObservedValue) -> bool {
        self.inner.observer.set(observer).is_ok()
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn downgrade(&self) -> WeakObject {
        WeakObject {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl WeakObject {
    pub fn upgrade(&self) -> Option<Object> {
        self.inner.upgrade().map(|inner| Object { inner })
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Object
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = Object::new();
        {
            let mut properties = object.inner.properties.write();
            for (key, value) in iter {
                properties.insert(key.into(), Property::data(value));
            }
        }
        object
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("keys", &self.keys())
            .field("observed", &self.observer().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_fields_read_and_write() {
        let obj: Object = [("a", 1)].into_iter().collect();
        assert_eq!(obj.get("a"), Value::from(1));

        obj.set("a", Value::from(2)).unwrap();
        obj.set("b", Value::from(3)).unwrap();
        assert_eq!(obj.get("a"), Value::from(2));
        assert_eq!(obj.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn accessor_fields_call_hooks() {
        let obj = Object::new();
        let store = Object::new();
        let read = store.clone();
        let write = store.clone();
        obj.define_property(
            "x",
            Property::accessor(
                Some(Arc::new(move |_: &Object| read.get("inner"))),
                Some(Arc::new(move |_: &Object, v: Value| write.set("inner", v).unwrap())),
            ),
        )
        .unwrap();

        obj.set("x", Value::from("hi")).unwrap();
        assert_eq!(store.get("inner"), Value::from("hi"));
        assert_eq!(obj.get("x"), Value::from("hi"));
    }

    #[test]
    fn getter_only_fields_are_read_only() {
        let obj = Object::new();
        let get: Getter = Arc::new(|_: &Object| Value::from(1));
        obj.define_property("x", Property::accessor(Some(get), None)).unwrap();
        assert!(matches!(
            obj.set("x", Value::from(2)),
            Err(ReactiveError::ReadOnly(_))
        ));
    }

    #[test]
    fn frozen_objects_refuse_changes() {
        let obj: Object = [("a", 1)].into_iter().collect();
        obj.freeze();

        assert!(obj.is_frozen());
        assert!(obj.set("a", Value::from(2)).is_err());
        assert!(obj.set("b", Value::from(2)).is_err());
        assert!(obj.remove("a").is_err());
        assert_eq!(obj.get("a"), Value::from(1));
    }

    #[test]
    fn locked_fields_cannot_be_redefined() {
        let obj = Object::new();
        obj.define_property("k", Property::data(1).locked()).unwrap();
        assert!(matches!(
            obj.define_property("k", Property::data(2)),
            Err(ReactiveError::NotConfigurable(_))
        ));
    }

    #[test]
    fn hidden_fields_are_not_enumerated() {
        let obj = Object::new();
        obj.define_property("secret", Property::data(1).hidden()).unwrap();
        assert!(obj.keys().is_empty());
        assert!(obj.has_own("secret"));
        assert_eq!(obj.len(), 1);
    }

    #[test]
    fn prototype_chain_supplies_reads() {
        let base: Object = [("inherited", 7)].into_iter().collect();
        let child = Object::with_proto(&base);

        assert!(child.has("inherited"));
        assert!(!child.has_own("inherited"));
        assert_eq!(child.get("inherited"), Value::from(7));

        child.set("inherited", Value::from(8)).unwrap();
        assert_eq!(child.get("inherited"), Value::from(8));
        assert_eq!(base.get("inherited"), Value::from(7));
    }

    #[test]
    fn redefinition_keeps_key_order() {
        let obj: Object = [("a", 1), ("b", 2)].into_iter().collect();
        obj.define_property("a", Property::data(9)).unwrap();
        assert_eq!(obj.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn remove_reports_presence() {
        let obj: Object = [("a", 1)].into_iter().collect();
        assert!(obj.remove("a").unwrap());
        assert!(!obj.remove("a").unwrap());
    }
}

//! Dynamic Values
//!
//! The observable data model. A [`Value`] is either a primitive, a container
//! with identity ([`Object`] or [`Array`]), or an [`Opaque`] host node that
//! the observer never touches.
//!
//! Containers are reference types: cloning a `Value::Object` clones the
//! handle, not the fields. Equality follows identity for containers and
//! content for primitives, with `NaN` equal to itself, which is exactly the
//! comparison the reactive setters use to suppress no-op writes.

use std::any::Any;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use super::array::Array;
use super::object::Object;
use super::observed::ObservedValue;
use crate::reactive::Runtime;

/// A value that can live inside an observed structure.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(f64),
    /// Immutable string.
    String(Arc<str>),
    /// Structure with named fields.
    Object(Object),
    /// Ordered list.
    Array(Array),
    /// Host node excluded from observation.
    Opaque(Opaque),
}

impl Value {
    /// Identity comparison: `===` with `NaN` equal to `NaN`.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// `true` for `Undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `true` for `Undefined` and `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// `true` for objects and arrays.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    /// `true` for every value that is not a container or host node.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Object(_) | Value::Array(_) | Value::Opaque(_))
    }

    /// Name of the value's kind, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Read a member by name.
    ///
    /// Object fields go through their accessors (and therefore register
    /// dependencies). List members are read by index without tracking;
    /// `length` yields the list length. Everything else is `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(obj) => obj.get(key),
            Value::Array(items) => {
                if key == "length" {
                    return Value::Number(items.len() as f64);
                }
                key.parse::<usize>()
                    .map(|index| items.get(index))
                    .unwrap_or_default()
            }
            _ => Value::Undefined,
        }
    }

    /// The observer attached to this container, if any.
    pub fn observer(&self) -> Option<ObservedValue> {
        match self {
            Value::Object(obj) => obj.observer(),
            Value::Array(items) => items.observer(),
            _ => None,
        }
    }

    /// Identity of a container, used for visited sets.
    pub(crate) fn addr(&self) -> Option<usize> {
        match self {
            Value::Object(obj) => Some(obj.addr()),
            Value::Array(items) => Some(items.addr()),
            _ => None,
        }
    }

    /// Ordering used by [`Array::sort`].
    ///
    /// Numbers compare numerically, strings lexically, booleans false
    /// first. Mixed kinds order by kind, and `Undefined` always sorts last.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::String(_) => 3,
                Value::Array(_) => 4,
                Value::Object(_) => 5,
                Value::Opaque(_) => 6,
                Value::Undefined => 7,
            }
        }

        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }

    /// Snapshot the value as JSON.
    ///
    /// Reads go through accessors. Shared substructure is written once per
    /// occurrence. A structure that contains itself has no JSON form: it
    /// yields `null` and a warning.
    pub fn to_json(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(json) => json,
            Err(err) => {
                Runtime::warn(&format!("Cannot convert value to JSON: {err}"), None);
                serde_json::Value::Null
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(obj) => obj.fmt(f),
            Value::Array(items) => items.fmt(f),
            Value::Opaque(node) => node.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Arc::from(value))
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}

impl From<Opaque> for Value {
    fn from(value: Opaque) -> Self {
        Value::Opaque(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => {
                Value::Object(fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ancestors = RefCell::new(HashSet::new());
        Snapshot {
            value: self,
            ancestors: &ancestors,
        }
        .serialize(serializer)
    }
}

/// Serialization cursor that remembers the containers on the current path,
/// so a structure that contains itself fails instead of recursing forever.
struct Snapshot<'a> {
    value: &'a Value,
    ancestors: &'a RefCell<HashSet<usize>>,
}

impl Snapshot<'_> {
    fn child<'b>(&'b self, value: &'b Value) -> Snapshot<'b> {
        Snapshot {
            value,
            ancestors: self.ancestors,
        }
    }
}

impl Serialize for Snapshot<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let addr = match self.value {
            Value::Undefined | Value::Null | Value::Opaque(_) => {
                return serializer.serialize_unit()
            }
            Value::Bool(b) => return serializer.serialize_bool(*b),
            Value::Number(n) => return serializer.serialize_f64(*n),
            Value::String(s) => return serializer.serialize_str(s),
            Value::Object(obj) => obj.addr(),
            Value::Array(items) => items.addr(),
        };
        if !self.ancestors.borrow_mut().insert(addr) {
            return Err(S::Error::custom("cyclic structure"));
        }

        let result = match self.value {
            Value::Object(obj) => {
                let keys = obj.keys();
                let mut map = serializer.serialize_map(Some(keys.len()))?;
                for key in keys {
                    let field = obj.get(&key);
                    map.serialize_entry(&key, &self.child(&field))?;
                }
                map.end()
            }
            Value::Array(items) => {
                let items = items.to_vec();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in &items {
                    seq.serialize_element(&self.child(item))?;
                }
                seq.end()
            }
            _ => serializer.serialize_unit(),
        };

        self.ancestors.borrow_mut().remove(&addr);
        result
    }
}

/// A host node (for example a virtual-DOM node) carried through observed
/// data but never wrapped.
#[derive(Clone)]
pub struct Opaque {
    inner: Arc<dyn Any + Send + Sync>,
    label: &'static str,
}

impl Opaque {
    /// Wrap a host value.
    pub fn new<T: Any + Send + Sync>(value: T, label: &'static str) -> Self {
        Self {
            inner: Arc::new(value),
            label,
        }
    }

    /// Borrow the host value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.label)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn nan_equals_nan() {
        let a = Value::Number(f64::NAN);
        let b = Value::Number(f64::NAN);
        assert!(a.same_value(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn containers_compare_by_identity() {
        let a = Object::new();
        let b = Object::new();
        assert_eq!(Value::from(a.clone()), Value::from(a));
        assert_ne!(Value::from(Object::new()), Value::from(b));
    }

    #[test]
    fn primitives_compare_by_content() {
        assert_eq!(Value::from("x"), Value::from(String::from("x")));
        assert_eq!(Value::from(2), Value::from(2.0));
        assert_ne!(Value::from(1), Value::from("1"));
        assert_ne!(Value::Undefined, Value::Null);
    }

    #[test]
    fn get_reads_list_members() {
        let list = Value::from(vec![10, 20]);
        assert_eq!(list.get("1"), Value::from(20));
        assert_eq!(list.get("length"), Value::from(2));
        assert_eq!(list.get("9"), Value::Undefined);
        assert_eq!(Value::Null.get("a"), Value::Undefined);
    }

    #[test]
    fn json_round_trip_preserves_shape() {
        let json = serde_json::json!({"a": 1.0, "list": [true, null, "s"], "nested": {"b": 2.0}});
        let value = Value::from(json.clone());
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn self_containing_object_is_not_serialized() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        Runtime::set_warn_handler(move |msg, _| sink.borrow_mut().push(msg.to_string()));

        let obj = Object::from_iter([("a", 1)]);
        obj.set("me", Value::from(obj.clone())).unwrap();
        let value = Value::from(obj);

        assert!(serde_json::to_string(&value).is_err());
        assert_eq!(value.to_json(), serde_json::Value::Null);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn self_containing_list_is_not_serialized() {
        let list = Array::from_iter([1]);
        list.push([Value::from(list.clone())]);
        let err = serde_json::to_string(&Value::from(list)).unwrap_err();
        assert!(err.to_string().contains("cyclic structure"));
    }

    #[test]
    fn shared_structure_serializes_each_occurrence() {
        let shared = Object::from_iter([("n", 1)]);
        let list = Array::from_iter([Value::from(shared.clone()), Value::from(shared.clone())]);
        let root = Object::from_iter([("left", Value::from(shared)), ("list", Value::from(list))]);
        assert_eq!(
            Value::from(root).to_json(),
            serde_json::json!({"left": {"n": 1.0}, "list": [{"n": 1.0}, {"n": 1.0}]})
        );
    }

    #[test]
    fn sort_cmp_puts_undefined_last() {
        let mut items = vec![Value::Undefined, Value::from(3), Value::from(1)];
        items.sort_by(Value::sort_cmp);
        assert_eq!(items, vec![Value::from(1), Value::from(3), Value::Undefined]);
    }

    #[test]
    fn opaque_nodes_downcast() {
        let node = Opaque::new(42_u8, "vnode");
        assert_eq!(node.downcast_ref::<u8>(), Some(&42));
        assert_eq!(node.label(), "vnode");
        assert!(Value::from(node).observer().is_none());
    }
}

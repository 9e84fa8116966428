//! Component Options
//!
//! Declarative description of an instance's reactive state, and the merge
//! strategies used when composing option sets: data is merged recursively
//! with the child's fields winning, and watch handler lists concatenate.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::Result;
use crate::observer::{set, Object, Setter, Value};
use crate::reactive::{WatchCallback, WatchGetter, WatcherOptions};

/// Produces an instance's initial data. Receives the instance scope.
pub type DataFn = Arc<dyn Fn(&Object) -> Result<Value> + Send + Sync>;

/// A computed property declaration.
#[derive(Clone)]
pub struct ComputedDef {
    pub get: Option<WatchGetter>,
    pub set: Option<Setter>,

    /// Cache through a lazy watcher. When `false`, every read calls `get`.
    pub cache: bool,
}

impl ComputedDef {
    pub fn new<F>(get: F) -> Self
    where
        F: Fn(&Object) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            get: Some(Arc::new(get)),
            set: None,
            cache: true,
        }
    }

    pub fn with_setter<F>(mut self, set: F) -> Self
    where
        F: Fn(&Object, Value) + Send + Sync + 'static,
    {
        self.set = Some(Arc::new(set));
        self
    }

    pub fn uncached(mut self) -> Self {
        self.cache = false;
        self
    }
}

/// A watch declaration.
#[derive(Clone)]
pub struct WatchDef {
    pub handler: WatchCallback,
    pub deep: bool,
    pub immediate: bool,
    pub sync: bool,
}

impl WatchDef {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            deep: false,
            immediate: false,
            sync: false,
        }
    }

    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    pub fn sync(mut self) -> Self {
        self.sync = true;
        self
    }

    pub(crate) fn options(&self) -> WatcherOptions {
        WatcherOptions::user()
            .with_deep(self.deep)
            .with_immediate(self.immediate)
            .with_sync(self.sync)
    }
}

/// Declarative state of an instance.
#[derive(Clone, Default)]
pub struct ComponentOptions {
    /// Resolved prop values, in declaration order.
    pub props: IndexMap<String, Value>,
    pub data: Option<DataFn>,
    pub computed: IndexMap<String, ComputedDef>,
    pub watch: IndexMap<String, Vec<WatchDef>>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn data<F>(mut self, data: F) -> Self
    where
        F: Fn(&Object) -> Result<Value> + Send + Sync + 'static,
    {
        self.data = Some(Arc::new(data));
        self
    }

    pub fn computed(mut self, key: impl Into<String>, def: ComputedDef) -> Self {
        self.computed.insert(key.into(), def);
        self
    }

    pub fn watch(mut self, key: impl Into<String>, def: WatchDef) -> Self {
        self.watch.entry(key.into()).or_default().push(def);
        self
    }

    /// Compose `child` over `parent`.
    ///
    /// Props and computed properties declared by the child replace the
    /// parent's. Data functions are merged with [`merge_data_fns`] and watch
    /// handlers with [`merge_watch`].
    pub fn merge(parent: &ComponentOptions, child: &ComponentOptions) -> ComponentOptions {
        let mut props = parent.props.clone();
        props.extend(child.props.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut computed = parent.computed.clone();
        computed.extend(child.computed.iter().map(|(k, v)| (k.clone(), v.clone())));

        ComponentOptions {
            props,
            data: merge_data_fns(parent.data.clone(), child.data.clone()),
            computed,
            watch: merge_watch(&parent.watch, &child.watch),
        }
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("props", &self.props.keys().collect::<Vec<_>>())
            .field("data", &self.data.is_some())
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("watch", &self.watch.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Merge the fields of `from` into `to` and return `to`.
///
/// Missing fields are added through [`set`], so they are reactive if `to`
/// is already observed. Fields present on both sides are kept from `to`,
/// except that two distinct objects are merged recursively.
pub fn merge_data(to: &Object, from: &Object) -> Object {
    let target = Value::Object(to.clone());
    for key in from.keys() {
        let from_val = from.get(&key);
        if !to.has_own(&key) {
            set(&target, key.as_str(), from_val);
            continue;
        }
        let to_val = to.get(&key);
        if let (Value::Object(to_obj), Value::Object(from_obj)) = (&to_val, &from_val) {
            if !to_obj.ptr_eq(from_obj) && !to_obj.is_instance() && !from_obj.is_instance() {
                merge_data(to_obj, from_obj);
            }
        }
    }
    to.clone()
}

/// Compose two data functions. The child's result wins field by field.
pub fn merge_data_fns(parent: Option<DataFn>, child: Option<DataFn>) -> Option<DataFn> {
    let (parent, child) = match (parent, child) {
        (parent, None) => return parent,
        (None, child) => return child,
        (Some(parent), Some(child)) => (parent, child),
    };
    Some(Arc::new(move |ctx: &Object| {
        let own = child(ctx)?;
        let inherited = parent(ctx)?;
        Ok(match (own, inherited) {
            (Value::Object(own), Value::Object(inherited)) => {
                Value::Object(merge_data(&own, &inherited))
            }
            (own, inherited) if own.is_nullish() => inherited,
            (own, _) => own,
        })
    }))
}

/// Concatenate watch handlers, parent first.
pub fn merge_watch(
    parent: &IndexMap<String, Vec<WatchDef>>,
    child: &IndexMap<String, Vec<WatchDef>>,
) -> IndexMap<String, Vec<WatchDef>> {
    let mut merged = parent.clone();
    for (key, defs) in child {
        merged
            .entry(key.clone())
            .or_default()
            .extend(defs.iter().cloned());
    }
    merged
}

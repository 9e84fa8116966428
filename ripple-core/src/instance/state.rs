//! Instance State
//!
//! An [`Instance`] is the owning context of a set of reactive state. It
//! turns [`ComponentOptions`] into live fields on an instance scope:
//!
//! 1. Props become reactive fields of a separate props object. On a
//!    non-root instance, prop values are not observed, and writing a prop
//!    from outside [`Instance::update_props`] warns.
//! 2. The data function runs with dependency collection disabled. Its
//!    result is observed as root data.
//! 3. Computed properties become accessors on the scope backed by lazy
//!    watchers.
//! 4. Watch declarations become user watchers.
//!
//! Props and data fields are proxied onto the scope, so every getter and
//! callback reads state by name from one object. Keys starting with `_` or
//! `$` are reserved and never proxied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::options::{ComponentOptions, ComputedDef, DataFn};
use crate::error::Result;
use crate::observer::{
    self, define_reactive, observe, CustomSetter, Key, Object, Property, Value,
};
use crate::reactive::{
    Computed, ReactiveContext, Runtime, WatchGetter, WatchSource, Watcher, WatcherOptions,
};

const RESERVED_ATTRIBUTES: [&str; 5] = ["key", "ref", "slot", "slot-scope", "is"];

/// The owning context of a set of reactive state.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

struct InstanceInner {
    /// Object every getter and callback receives.
    scope: Object,
    props: Object,
    data: RwLock<Object>,
    computed: RwLock<IndexMap<String, Computed>>,
    watchers: Mutex<Vec<Watcher>>,
    is_root: bool,
    updating_props: AtomicBool,
    torn_down: AtomicBool,
}

impl Instance {
    /// Create a root instance.
    pub fn root(options: ComponentOptions) -> Self {
        Self::build(options, true)
    }

    /// Create an instance owned by a parent. Its props belong to the
    /// parent and are not observed here.
    pub fn child(options: ComponentOptions) -> Self {
        Self::build(options, false)
    }

    fn build(options: ComponentOptions, is_root: bool) -> Self {
        let instance = Self {
            inner: Arc::new(InstanceInner {
                scope: Object::instance(),
                props: Object::new(),
                data: RwLock::new(Object::new()),
                computed: RwLock::new(IndexMap::new()),
                watchers: Mutex::new(Vec::new()),
                is_root,
                updating_props: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
            }),
        };

        instance.init_props(&options.props);
        instance.init_data(options.data.as_ref());
        instance.init_computed(&options.computed);
        for (key, defs) in &options.watch {
            for def in defs {
                instance.add_watcher(Watcher::new(
                    &instance.inner.scope,
                    key.as_str(),
                    Some(def.handler.clone()),
                    def.options(),
                ));
            }
        }

        debug!(
            root = is_root,
            props = options.props.len(),
            computed = options.computed.len(),
            "instance initialized"
        );
        instance
    }

    fn weak(&self) -> Weak<InstanceInner> {
        Arc::downgrade(&self.inner)
    }

    fn warn(&self, message: &str) {
        Runtime::warn(message, Some(&self.inner.scope));
    }

    fn init_props(&self, props: &IndexMap<String, Value>) {
        let inner = &self.inner;
        if !inner.is_root {
            Runtime::toggle_observing(false);
        }

        for (key, value) in props {
            let attribute = hyphenate(key);
            if RESERVED_ATTRIBUTES.contains(&attribute.as_str()) {
                self.warn(&format!(
                    "\"{attribute}\" is a reserved attribute and cannot be used as component prop."
                ));
            }

            let weak = self.weak();
            let prop = key.clone();
            let on_write: CustomSetter = Arc::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !inner.is_root && !inner.updating_props.load(Ordering::SeqCst) {
                    Runtime::warn(
                        &format!(
                            "Avoid mutating a prop directly since the value will be overwritten \
                             whenever the parent component re-renders. Instead, use a data or \
                             computed property based on the prop's value. Prop being mutated: \
                             \"{prop}\""
                        ),
                        Some(&inner.scope),
                    );
                }
            });
            define_reactive(&inner.props, key, Some(value.clone()), Some(on_write), false);

            if !inner.scope.has(key) {
                proxy(&inner.scope, &inner.props, key);
            }
        }

        Runtime::toggle_observing(true);
    }

    fn init_data(&self, data_fn: Option<&DataFn>) {
        let inner = &self.inner;
        let data = match data_fn.map(|f| self.get_data(f)) {
            None => Object::new(),
            Some(Value::Object(obj)) if !obj.is_instance() => obj,
            Some(_) => {
                self.warn("data functions should return an object.");
                Object::new()
            }
        };

        for key in data.keys() {
            if inner.props.has_own(&key) {
                self.warn(&format!(
                    "The data property \"{key}\" is already declared as a prop. \
                     Use prop default value instead."
                ));
            } else if !is_reserved(&key) {
                proxy(&inner.scope, &data, &key);
            }
        }

        *inner.data.write() = data.clone();
        observe(&Value::Object(data), true);
    }

    fn get_data(&self, data_fn: &DataFn) -> Value {
        let _untracked = ReactiveContext::untracked();
        match data_fn(&self.inner.scope) {
            Ok(value) => value,
            Err(err) => {
                Runtime::handle_error(&err, Some(&self.inner.scope), "data()");
                Value::Object(Object::new())
            }
        }
    }

    fn init_computed(&self, computed: &IndexMap<String, ComputedDef>) {
        let inner = &self.inner;
        for (key, def) in computed {
            let getter: WatchGetter = match &def.get {
                Some(getter) => getter.clone(),
                None => {
                    self.warn(&format!("Getter is missing for computed property \"{key}\"."));
                    Arc::new(|_: &Object| Ok(Value::Undefined))
                }
            };
            let value = Computed::new(&inner.scope, move |ctx: &Object| getter(ctx));
            inner.computed.write().insert(key.clone(), value);

            if !inner.scope.has(key) {
                self.define_computed(key, def);
            } else if inner.data.read().has_own(key) {
                self.warn(&format!(
                    "The computed property \"{key}\" is already defined in data."
                ));
            } else if inner.props.has_own(key) {
                self.warn(&format!(
                    "The computed property \"{key}\" is already defined as a prop."
                ));
            }
        }
    }

    fn define_computed(&self, key: &str, def: &ComputedDef) {
        let get: Arc<dyn Fn(&Object) -> Value + Send + Sync> = match &def.get {
            Some(_) if def.cache => {
                let weak = self.weak();
                let key = key.to_string();
                Arc::new(move |_: &Object| {
                    let Some(inner) = weak.upgrade() else {
                        return Value::Undefined;
                    };
                    let computed = inner.computed.read().get(&key).cloned();
                    computed.map(|computed| computed.get()).unwrap_or_default()
                })
            }
            Some(getter) => {
                let getter = getter.clone();
                let key = key.to_string();
                Arc::new(move |ctx: &Object| match getter(ctx) {
                    Ok(value) => value,
                    Err(err) => {
                        Runtime::handle_error(
                            &err,
                            Some(ctx),
                            &format!("getter for computed property \"{key}\""),
                        );
                        Value::Undefined
                    }
                })
            }
            None => Arc::new(|_: &Object| Value::Undefined),
        };

        let set: Arc<dyn Fn(&Object, Value) + Send + Sync> = match &def.set {
            Some(setter) => setter.clone(),
            None if !Runtime::config().production => {
                let key = key.to_string();
                Arc::new(move |ctx: &Object, _: Value| {
                    Runtime::warn(
                        &format!(
                            "Computed property \"{key}\" was assigned to but it has no setter."
                        ),
                        Some(ctx),
                    );
                })
            }
            None => Arc::new(|_: &Object, _: Value| {}),
        };

        if let Err(err) = self
            .inner
            .scope
            .define_property(key, Property::accessor(Some(get), Some(set)))
        {
            self.warn(&format!("Cannot define computed property \"{key}\": {err}"));
        }
    }

    fn add_watcher(&self, watcher: Watcher) -> Watcher {
        self.inner.watchers.lock().push(watcher.clone());
        watcher
    }

    /// Watch a path or getter on this instance. The callback receives
    /// `(new, old)`; `options.user` is always set.
    pub fn watch<F>(
        &self,
        source: impl Into<WatchSource>,
        callback: F,
        options: WatcherOptions,
    ) -> Watcher
    where
        F: Fn(&Value, &Value) -> Result<()> + Send + Sync + 'static,
    {
        self.add_watcher(Watcher::watch(&self.inner.scope, source, callback, options))
    }

    /// Run `effect` now and again whenever anything it read changes.
    pub fn render_effect<F>(&self, effect: F) -> Watcher
    where
        F: Fn(&Object) -> Result<()> + Send + Sync + 'static,
    {
        self.add_watcher(Watcher::render(&self.inner.scope, effect))
    }

    /// Read a prop, data field, or computed property by name.
    pub fn get(&self, key: &str) -> Value {
        self.inner.scope.get(key)
    }

    /// Write a prop, data field, or computed property by name.
    pub fn assign(&self, key: &str, value: impl Into<Value>) {
        if let Err(err) = self.inner.scope.set(key, value.into()) {
            self.warn(&format!("Cannot assign \"{key}\": {err}"));
        }
    }

    /// See [`observer::set`].
    pub fn set(&self, target: &Value, key: impl Into<Key>, value: impl Into<Value>) -> Value {
        observer::set(target, key, value.into())
    }

    /// See [`observer::del`].
    pub fn delete(&self, target: &Value, key: impl Into<Key>) {
        observer::del(target, key);
    }

    /// Push new prop values from the parent.
    ///
    /// Values are not observed, mirroring prop initialization on a child.
    pub fn update_props<I, K, V>(&self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let inner = &self.inner;
        Runtime::toggle_observing(false);
        inner.updating_props.store(true, Ordering::SeqCst);
        for (key, value) in values {
            let key = key.as_ref();
            if inner.props.has_own(key) {
                if let Err(err) = inner.props.set(key, value.into()) {
                    self.warn(&format!("Cannot update prop \"{key}\": {err}"));
                }
            } else {
                self.warn(&format!("Unknown prop \"{key}\"."));
            }
        }
        inner.updating_props.store(false, Ordering::SeqCst);
        Runtime::toggle_observing(true);
    }

    /// The instance scope.
    pub fn scope(&self) -> &Object {
        &self.inner.scope
    }

    /// The root data object.
    pub fn data(&self) -> Object {
        self.inner.data.read().clone()
    }

    pub fn props(&self) -> &Object {
        &self.inner.props
    }

    pub fn is_root(&self) -> bool {
        self.inner.is_root
    }

    /// The watcher behind a cached computed property.
    pub fn computed(&self, key: &str) -> Option<Computed> {
        self.inner.computed.read().get(key).cloned()
    }

    /// Watchers created through this instance, including declared watches
    /// and render effects.
    pub fn watchers(&self) -> Vec<Watcher> {
        self.inner.watchers.lock().clone()
    }

    /// Tear down every watcher and release the root data. Idempotent.
    pub fn teardown(&self) {
        let inner = &self.inner;
        if inner.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let watchers = std::mem::take(&mut *inner.watchers.lock());
        for watcher in &watchers {
            watcher.teardown();
        }
        let computed: Vec<Computed> = inner.computed.read().values().cloned().collect();
        for value in &computed {
            value.teardown();
        }
        if let Some(observer) = inner.data.read().observer() {
            observer.remove_root();
        }

        debug!(
            watchers = watchers.len(),
            computed = computed.len(),
            "instance torn down"
        );
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::SeqCst)
    }
}

/// Expose `source.key` as `target.key`.
fn proxy(target: &Object, source: &Object, key: &str) {
    let reader = source.clone();
    let writer = source.clone();
    let read_key = key.to_string();
    let write_key = key.to_string();
    let property = Property::accessor(
        Some(Arc::new(move |_: &Object| reader.get(&read_key))),
        Some(Arc::new(move |_: &Object, value: Value| {
            if let Err(err) = writer.set(&write_key, value) {
                Runtime::warn(&format!("Cannot assign \"{write_key}\": {err}"), None);
            }
        })),
    );
    if let Err(err) = target.define_property(key, property) {
        Runtime::warn(&format!("Cannot proxy \"{key}\": {err}"), Some(target));
    }
}

/// Keys starting with `$` or `_` belong to the runtime.
fn is_reserved(key: &str) -> bool {
    key.starts_with('$') || key.starts_with('_')
}

/// `slotScope` -> `slot-scope`.
fn hyphenate(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

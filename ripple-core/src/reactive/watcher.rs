//! Watcher Implementation
//!
//! A Watcher is a re-runnable computation. It reads observed data through a
//! getter, remembers which dependencies it touched, and re-runs when any of
//! them notifies.
//!
//! # How Watchers Work
//!
//! 1. [`Watcher::get`] pushes the watcher onto the active stack and runs the
//!    getter. Every reactive read calls back into `add_dep`, which records
//!    the dependency for this run and subscribes to it if it is new.
//!
//! 2. When the run ends, dependencies that were held before but not touched
//!    this time are unsubscribed. The subscription set always reflects the
//!    most recent run.
//!
//! 3. When a dependency notifies, a lazy watcher only marks itself dirty.
//!    A sync watcher re-runs on the spot, and any other watcher is handed to
//!    the runtime's scheduler (which, by default, runs it immediately).
//!
//! 4. [`Watcher::run`] re-evaluates and, if the value changed, invokes the
//!    change callback with `(new, old)`.
//!
//! # Flavors
//!
//! - Render effects: eager, no meaningful callback.
//! - User watchers (`user: true`): callbacks are user code; failures go to
//!   the runtime error hook.
//! - Computed properties (`lazy: true`): see [`Computed`](super::Computed).
//!
//! # Re-entrancy
//!
//! A watcher that is already evaluating does not evaluate again. A getter
//! that writes a field it has just read therefore settles instead of
//! looping; the nested request sees the previous value.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::context::ReactiveContext;
use super::dep::{DepId, Dependency};
use super::path::{parse_path, resolve_path};
use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::Result;
use crate::observer::{traverse, Object, Value};

/// Evaluation function of a watcher. Receives the owning context.
pub type WatchGetter = Arc<dyn Fn(&Object) -> Result<Value> + Send + Sync>;

/// Change callback. Receives `(new, old)`.
pub type WatchCallback = Arc<dyn Fn(&Value, &Value) -> Result<()> + Send + Sync>;

/// What a watcher evaluates.
#[derive(Clone)]
pub enum WatchSource {
    /// Arbitrary getter.
    Function(WatchGetter),
    /// Dotted path resolved against the owning context, e.g. `"a.b.c"`.
    Path(String),
}

impl WatchSource {
    pub fn function<F>(getter: F) -> Self
    where
        F: Fn(&Object) -> Result<Value> + Send + Sync + 'static,
    {
        WatchSource::Function(Arc::new(getter))
    }
}

impl From<&str> for WatchSource {
    fn from(path: &str) -> Self {
        WatchSource::Path(path.to_string())
    }
}

impl From<String> for WatchSource {
    fn from(path: String) -> Self {
        WatchSource::Path(path)
    }
}

impl From<WatchGetter> for WatchSource {
    fn from(getter: WatchGetter) -> Self {
        WatchSource::Function(getter)
    }
}

/// Behavior switches for a watcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherOptions {
    /// Defer evaluation until read; used by computed properties.
    pub lazy: bool,

    /// Traverse the value so nested changes also notify.
    pub deep: bool,

    /// The callback is user code and needs error isolation.
    pub user: bool,

    /// Re-run on notification instead of going through the scheduler.
    pub sync: bool,

    /// Invoke the callback once right after construction.
    pub immediate: bool,
}

impl WatcherOptions {
    /// Options for a user-facing watcher.
    pub fn user() -> Self {
        Self {
            user: true,
            ..Self::default()
        }
    }

    /// Options for a computed property.
    pub fn lazy() -> Self {
        Self {
            lazy: true,
            ..Self::default()
        }
    }

    pub fn with_deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }
}

/// A re-runnable computation over observed data.
///
/// Cloning a `Watcher` yields another handle to the same computation.
/// Dependencies hold watchers weakly: once every handle is dropped, the
/// watcher stops receiving notifications.
#[derive(Clone)]
pub struct Watcher {
    inner: Arc<WatcherInner>,
}

struct WatcherInner {
    id: SubscriberId,
    this: Weak<WatcherInner>,

    /// Owning context, passed to the getter.
    context: Object,

    /// `None` when the source path failed to parse.
    getter: Option<WatchGetter>,
    callback: Option<WatchCallback>,
    options: WatcherOptions,

    /// Label used in diagnostics.
    expression: String,

    state: Mutex<WatcherState>,
}

struct WatcherState {
    value: Value,
    dirty: bool,
    active: bool,
    evaluating: bool,

    /// Dependencies from the last completed run.
    deps: IndexMap<DepId, Dependency>,

    /// Dependencies touched by the run in progress.
    new_deps: IndexMap<DepId, Dependency>,

    evaluations: usize,
}

impl Watcher {
    /// Create a watcher bound to `context`.
    ///
    /// Unless lazy, the getter runs once immediately to establish the
    /// initial value and dependencies.
    pub fn new(
        context: &Object,
        source: impl Into<WatchSource>,
        callback: Option<WatchCallback>,
        options: WatcherOptions,
    ) -> Self {
        let (getter, expression) = match source.into() {
            WatchSource::Function(getter) => (Some(getter), "<function>".to_string()),
            WatchSource::Path(path) => match parse_path(&path) {
                Some(segments) => {
                    let getter: WatchGetter =
                        Arc::new(move |ctx: &Object| Ok(resolve_path(ctx, &segments)));
                    (Some(getter), path)
                }
                None => {
                    Runtime::warn(
                        &format!(
                            "Failed watching path: \"{path}\" Watcher only accepts simple \
                             dot-delimited paths. For full control, use a function instead."
                        ),
                        Some(context),
                    );
                    (None, path)
                }
            },
        };

        let inner = Arc::new_cyclic(|this| WatcherInner {
            id: SubscriberId::new(),
            this: this.clone(),
            context: context.clone(),
            getter,
            callback,
            options,
            expression,
            state: Mutex::new(WatcherState {
                value: Value::Undefined,
                dirty: options.lazy,
                active: true,
                evaluating: false,
                deps: IndexMap::new(),
                new_deps: IndexMap::new(),
                evaluations: 0,
            }),
        });
        let watcher = Self { inner };
        trace!(
            watcher = watcher.id().raw(),
            expression = %watcher.inner.expression,
            "watcher created"
        );

        if !options.lazy {
            let value = watcher.get();
            watcher.inner.state.lock().value = value;
        }

        if options.user && options.immediate {
            let value = watcher.value();
            let _untracked = ReactiveContext::untracked();
            watcher.invoke_callback(
                &value,
                &Value::Undefined,
                format!("callback for immediate watcher \"{}\"", watcher.inner.expression),
            );
        }

        watcher
    }

    /// Create a user watcher with a change callback.
    pub fn watch<F>(
        context: &Object,
        source: impl Into<WatchSource>,
        callback: F,
        options: WatcherOptions,
    ) -> Self
    where
        F: Fn(&Value, &Value) -> Result<()> + Send + Sync + 'static,
    {
        let options = WatcherOptions {
            user: true,
            ..options
        };
        let callback: WatchCallback = Arc::new(callback);
        Self::new(context, source, Some(callback), options)
    }

    /// Create an eager effect that re-runs `effect` whenever anything it
    /// read changes.
    pub fn render<F>(context: &Object, effect: F) -> Self
    where
        F: Fn(&Object) -> Result<()> + Send + Sync + 'static,
    {
        let source = WatchSource::function(move |ctx: &Object| {
            effect(ctx)?;
            Ok(Value::Undefined)
        });
        Self::new(context, source, None, WatcherOptions::default())
    }

    /// Evaluate the getter and re-collect dependencies.
    ///
    /// Errors raised by the getter are reported and yield `Undefined`.
    pub fn get(&self) -> Value {
        {
            let mut state = self.inner.state.lock();
            if state.evaluating {
                return state.value.clone();
            }
            state.evaluating = true;
        }

        let value = {
            let _ctx = ReactiveContext::enter(Some(self.as_subscriber()));
            let value = match &self.inner.getter {
                Some(getter) => match getter(&self.inner.context) {
                    Ok(value) => value,
                    Err(err) => {
                        Runtime::handle_error(
                            &err,
                            Some(&self.inner.context),
                            &format!("getter for watcher \"{}\"", self.inner.expression),
                        );
                        Value::Undefined
                    }
                },
                None => Value::Undefined,
            };
            if self.inner.options.deep {
                traverse(&value);
            }
            value
        };

        self.cleanup_deps();

        let mut state = self.inner.state.lock();
        state.evaluating = false;
        state.evaluations += 1;
        value
    }

    /// Swap in the dependencies of the run that just finished and
    /// unsubscribe from the ones it no longer uses.
    fn cleanup_deps(&self) {
        let stale: Vec<Dependency> = {
            let mut state = self.inner.state.lock();
            let fresh = std::mem::take(&mut state.new_deps);
            let previous = std::mem::replace(&mut state.deps, fresh);
            previous
                .into_iter()
                .filter(|(id, _)| !state.deps.contains_key(id))
                .map(|(_, dep)| dep)
                .collect()
        };
        for dep in stale {
            dep.remove_sub(self.inner.id);
        }
    }

    /// Notification entry point, as called by a dependency.
    pub fn update(&self) {
        self.inner.update();
    }

    /// Re-evaluate and invoke the callback if the value changed.
    ///
    /// The callback fires when the new value differs from the old one, when
    /// the value is a container (it may have been mutated in place), or when
    /// the watcher is deep.
    pub fn run(&self) {
        {
            let state = self.inner.state.lock();
            if !state.active || state.evaluating {
                return;
            }
        }

        let value = self.get();
        let old = {
            let mut state = self.inner.state.lock();
            let fire = !value.same_value(&state.value)
                || value.is_container()
                || self.inner.options.deep;
            if !fire {
                return;
            }
            std::mem::replace(&mut state.value, value.clone())
        };

        trace!(watcher = self.id().raw(), "watcher changed");
        self.invoke_callback(
            &value,
            &old,
            format!("callback for watcher \"{}\"", self.inner.expression),
        );
    }

    fn invoke_callback(&self, new: &Value, old: &Value, info: String) {
        if let Some(callback) = &self.inner.callback {
            if let Err(err) = callback(new, old) {
                Runtime::handle_error(&err, Some(&self.inner.context), &info);
            }
        }
    }

    /// Re-evaluate a lazy watcher and mark it clean.
    pub fn evaluate(&self) {
        let value = self.get();
        let mut state = self.inner.state.lock();
        state.value = value;
        state.dirty = false;
    }

    /// Register every dependency of this watcher with the active subscriber.
    pub fn depend(&self) {
        let deps: Vec<Dependency> = self.inner.state.lock().deps.values().cloned().collect();
        for dep in deps {
            dep.depend();
        }
    }

    /// Unsubscribe from every dependency. Safe to call more than once.
    pub fn teardown(&self) {
        let deps = {
            let mut state = self.inner.state.lock();
            if !state.active {
                return;
            }
            state.active = false;
            state.new_deps.clear();
            std::mem::take(&mut state.deps)
        };
        for dep in deps.values() {
            dep.remove_sub(self.inner.id);
        }
        debug!(watcher = self.id().raw(), deps = deps.len(), "watcher torn down");
    }

    fn as_subscriber(&self) -> Arc<dyn Subscriber> {
        self.inner.clone()
    }

    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Last computed value.
    pub fn value(&self) -> Value {
        self.inner.state.lock().value.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.state.lock().dirty
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active
    }

    pub fn options(&self) -> WatcherOptions {
        self.inner.options
    }

    /// The watched path, or `<function>`.
    pub fn expression(&self) -> &str {
        &self.inner.expression
    }

    pub fn context(&self) -> &Object {
        &self.inner.context
    }

    /// Number of dependencies held from the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.state.lock().deps.len()
    }

    /// Number of completed getter runs.
    pub fn evaluation_count(&self) -> usize {
        self.inner.state.lock().evaluations
    }

    pub fn ptr_eq(&self, other: &Watcher) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Subscriber for WatcherInner {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(&self, dep: &Dependency) {
        let subscribe = {
            let mut state = self.state.lock();
            let id = dep.id();
            if !state.active || state.new_deps.contains_key(&id) {
                return;
            }
            state.new_deps.insert(id, dep.clone());
            !state.deps.contains_key(&id)
        };
        if subscribe {
            if let Some(this) = self.this.upgrade() {
                let this: Arc<dyn Subscriber> = this;
                dep.add_sub(&this);
            }
        }
    }

    fn update(&self) {
        if self.options.lazy {
            self.state.lock().dirty = true;
            return;
        }
        let Some(inner) = self.this.upgrade() else {
            return;
        };
        let watcher = Watcher { inner };
        if self.options.sync {
            watcher.run();
        } else {
            Runtime::queue_watcher(watcher);
        }
    }
}

impl Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("expression", &self.inner.expression)
            .field("options", &self.inner.options)
            .field("dirty", &self.is_dirty())
            .field("active", &self.is_active())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

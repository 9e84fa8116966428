//! Computed Values
//!
//! A Computed is a cached derived value backed by a lazy [`Watcher`].
//!
//! # How Computed Values Work
//!
//! 1. Nothing runs at construction. The first read evaluates the getter and
//!    caches the result.
//!
//! 2. Further reads return the cache as long as the watcher is clean.
//!
//! 3. When a dependency changes, the watcher is only marked dirty. The next
//!    read re-evaluates, exactly once.
//!
//! 4. A read from inside another watcher's evaluation forwards every
//!    dependency of the computed to that watcher. The outer watcher never
//!    reads the underlying fields itself, yet it still re-runs when they
//!    change.
//!
//! # Why This Matters
//!
//! Computed values that are never read stay dirty and cost nothing.

use std::fmt::Debug;

use super::context::ReactiveContext;
use super::watcher::{WatchSource, Watcher, WatcherOptions};
use crate::error::Result;
use crate::observer::{Object, Value};

/// A cached derived value.
#[derive(Clone)]
pub struct Computed {
    watcher: Watcher,
}

impl Computed {
    /// Create a computed value over `context`. The getter does not run yet.
    pub fn new<F>(context: &Object, getter: F) -> Self
    where
        F: Fn(&Object) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            watcher: Watcher::new(
                context,
                WatchSource::function(getter),
                None,
                WatcherOptions::lazy(),
            ),
        }
    }

    /// Current value, re-evaluating first if a dependency changed.
    pub fn get(&self) -> Value {
        if self.watcher.is_dirty() {
            self.watcher.evaluate();
        }
        if ReactiveContext::is_active() {
            self.watcher.depend();
        }
        self.watcher.value()
    }

    pub fn is_dirty(&self) -> bool {
        self.watcher.is_dirty()
    }

    /// The lazy watcher behind this value.
    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    pub fn teardown(&self) {
        self.watcher.teardown();
    }
}

impl Debug for Computed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("dirty", &self.is_dirty())
            .field("watcher", &self.watcher.id())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

//! Ripple Core
//!
//! This crate provides the reactivity engine behind Ripple: transparent
//! dependency tracking over plain data. It implements:
//!
//! - Observable data (structures, ordered lists, and the set/delete gateway)
//! - Dependencies, watchers, and cached computed values
//! - Instance integration (props, data, computed properties, watches)
//!
//! Computations never declare what they depend on. Whatever observed data a
//! watcher reads while it evaluates becomes its dependency set, and writing
//! any of it re-runs the watcher.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `observer`: the data model and the machinery that makes it reactive
//! - `reactive`: dependencies, the active computation stack, watchers
//! - `instance`: owning contexts built from declarative options
//! - `error`: the error type routed through the runtime error hook
//!
//! # Example
//!
//! ```rust,ignore
//! use ripple_core::observer::{observe, Object, Value};
//! use ripple_core::reactive::{WatchSource, Watcher, WatcherOptions};
//!
//! let state = Object::from_iter([("count", 1)]);
//! observe(&Value::from(state.clone()), false);
//!
//! let doubled = Watcher::new(
//!     &state,
//!     WatchSource::function(|ctx: &Object| {
//!         Ok(Value::from(ctx.get("count").as_f64().unwrap_or(0.0) * 2.0))
//!     }),
//!     None,
//!     WatcherOptions::default(),
//! );
//!
//! state.set("count", Value::from(5))?;
//! assert_eq!(doubled.value(), Value::from(10));
//! ```

pub mod error;
pub mod instance;
pub mod observer;
pub mod reactive;

pub use error::{ReactiveError, Result};
pub use instance::{ComponentOptions, Instance};
pub use observer::{del, observe, set, Array, Object, Value};
pub use reactive::{Computed, Dependency, Runtime, Watcher, WatcherOptions};

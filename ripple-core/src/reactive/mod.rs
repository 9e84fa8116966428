//! Reactive Primitives
//!
//! This module implements dependency tracking: dependencies, the active
//! computation stack, watchers, and computed values. Together with the
//! observed data model in [`observer`](crate::observer) they form the core
//! of Ripple's transparent reactivity.
//!
//! # Concepts
//!
//! ## Dependencies
//!
//! A [`Dependency`] is a publish/subscribe channel attached to one
//! observable slot. Reading the slot while a watcher evaluates subscribes
//! the watcher; writing the slot notifies every subscriber.
//!
//! ## Watchers
//!
//! A [`Watcher`] is a computation that re-runs when anything it read
//! changes. Dependencies are recollected on every run, so a watcher never
//! reacts to a slot it stopped reading.
//!
//! ## Computed Values
//!
//! A [`Computed`] is a lazy watcher with a cache. It only re-evaluates when
//! read after one of its dependencies changed.
//!
//! # Implementation Notes
//!
//! The active computation stack and all runtime switches live in
//! thread-local storage. Reactivity is single-threaded per thread: separate
//! threads may host independent reactive trees, but a tree must not be
//! shared across threads while it is evaluating.

mod computed;
mod context;
mod dep;
mod path;
mod runtime;
mod subscriber;
mod watcher;

pub use computed::Computed;
pub use context::ReactiveContext;
pub use dep::{DepId, Dependency};
pub use path::{parse_path, resolve_path, Path};
pub use runtime::{toggle_observing, Config, ErrorHandler, Runtime, Scheduler, WarnHandler};
pub use subscriber::{Subscriber, SubscriberId};
pub use watcher::{WatchCallback, WatchGetter, WatchSource, Watcher, WatcherOptions};

//! Observable Data
//!
//! This module holds the data model that the reactive core instruments and
//! the machinery that makes it reactive.
//!
//! # Data Model
//!
//! A [`Value`] is either a primitive, an opaque host value, or one of two
//! container kinds with reference identity: an [`Object`] (named fields) or
//! an [`Array`] (ordered list). Cloning a container clones the handle, not
//! the contents.
//!
//! # Making Data Reactive
//!
//! [`observe`] walks a container and rewrites every field of every reachable
//! object into a reactive accessor (see [`define_reactive`]). Lists are
//! reactive through their own mutating operations, which notify the list's
//! collection-level dependency. Members added or removed after observation
//! must go through [`set`] and [`del`].
//!
//! ```rust,ignore
//! use ripple_core::observer::{observe, Object, Value};
//!
//! let state = Object::from_iter([("count", 1)]);
//! observe(&Value::from(state.clone()), false);
//!
//! // Reads inside a watcher now register the field; writes notify it.
//! state.set("count", Value::from(2))?;
//! ```

mod array;
mod define;
mod mutation;
mod object;
mod observed;
mod traverse;
mod value;

pub use array::Array;
pub use define::{define_reactive, depend_array, CustomSetter};
pub use mutation::{del, set, Key};
pub use object::{Getter, Object, Property, Setter, Slot, WeakObject};
pub use observed::{observe, ObservedValue};
pub use traverse::traverse;
pub use value::{Opaque, Value};

//! Instance Integration
//!
//! The owning-context layer that consumes the reactive core: it declares
//! props, data, computed properties and watches through
//! [`ComponentOptions`], and wires them into live reactive state on an
//! [`Instance`].

mod options;
mod state;

pub use options::{
    merge_data, merge_data_fns, merge_watch, ComponentOptions, ComputedDef, DataFn, WatchDef,
};
pub use state::Instance;

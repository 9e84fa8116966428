//! Error types for the reactive core.
//!
//! Nothing in the core is fatal. User code (getters, data functions, watch
//! callbacks) reports failures through [`ReactiveError`]; the watcher that
//! invoked the code catches the error and forwards it to
//! [`Runtime::handle_error`](crate::reactive::Runtime::handle_error).
//! Structural refusals from [`Object`](crate::observer::Object) surface as
//! `Err` values that callers either propagate or turn into warnings.

use thiserror::Error;

/// Boxed foreign error accepted by [`ReactiveError::Other`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by or routed through the reactive core.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A user getter, data function, or callback failed.
    #[error("{0}")]
    Callback(String),

    /// A watch expression is not a simple dotted path.
    #[error("invalid watch path `{0}`")]
    InvalidPath(String),

    /// A property could not be added because the object is not extensible.
    #[error("cannot add property `{0}`: object is not extensible")]
    NotExtensible(String),

    /// A property could not be redefined or removed.
    #[error("property `{0}` is not configurable")]
    NotConfigurable(String),

    /// A data property is not writable.
    #[error("cannot assign to read-only property `{0}`")]
    ReadOnly(String),

    /// A list length or index beyond what a list may hold.
    #[error("invalid list length {0}")]
    InvalidLength(usize),

    /// Any other error raised by user code.
    #[error(transparent)]
    Other(#[from] BoxError),
}

impl ReactiveError {
    /// Build a callback error from a message.
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback(message.into())
    }
}

/// Result alias used by user-supplied reactive code.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

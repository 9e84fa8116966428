//! Reactive Runtime
//!
//! The runtime holds the ambient state that the reactive core consults but
//! does not own: configuration, the observation switch, and the hooks through
//! which it talks to its collaborators.
//!
//! # Collaborators
//!
//! - A [`Scheduler`] decides *when* an eager watcher re-runs after being
//!   notified. Without one, watchers run immediately.
//! - An error handler receives failures from user callbacks. Without one,
//!   errors are logged with `tracing::error!`.
//! - A warning handler receives configuration warnings. Without one,
//!   warnings are logged with `tracing::warn!`.
//!
//! # Thread Safety
//!
//! All runtime state is thread-local, like the active computation stack.
//! Independent reactive trees on different threads do not share switches
//! or hooks.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{error, warn};

use super::watcher::Watcher;
use crate::error::ReactiveError;
use crate::observer::Object;

/// Runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Suppress warnings and prop-mutation hooks.
    pub production: bool,

    /// Notify subscribers in creation order rather than registration order.
    pub ordered_notify: bool,

    /// Drop warnings without reporting them anywhere.
    pub silent: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            production: false,
            ordered_notify: cfg!(debug_assertions),
            silent: false,
        }
    }
}

/// External collaborator that decides when notified watchers re-run.
pub trait Scheduler {
    /// Accept a watcher whose dependencies changed.
    ///
    /// The scheduler must eventually call [`Watcher::run`] for the update
    /// to take effect. Deduplication is the scheduler's business.
    fn queue(&self, watcher: Watcher);
}

/// Hook receiving errors raised by user code.
pub type ErrorHandler = Rc<dyn Fn(&ReactiveError, Option<&Object>, &str)>;

/// Hook receiving configuration warnings.
pub type WarnHandler = Rc<dyn Fn(&str, Option<&Object>)>;

struct RuntimeState {
    config: Config,
    should_observe: bool,
    scheduler: Option<Rc<dyn Scheduler>>,
    error_handler: Option<ErrorHandler>,
    warn_handler: Option<WarnHandler>,
}

impl RuntimeState {
    fn new() -> Self {
        Self {
            config: Config::default(),
            should_observe: true,
            scheduler: None,
            error_handler: None,
            warn_handler: None,
        }
    }
}

thread_local! {
    static RUNTIME: RefCell<RuntimeState> = RefCell::new(RuntimeState::new());
}

/// Entry point for the runtime's ambient state.
pub struct Runtime;

impl Runtime {
    /// Current configuration.
    pub fn config() -> Config {
        RUNTIME.with(|rt| rt.borrow().config)
    }

    /// Update the configuration in place.
    pub fn configure<F>(f: F)
    where
        F: FnOnce(&mut Config),
    {
        RUNTIME.with(|rt| f(&mut rt.borrow_mut().config));
    }

    /// Enable or disable creation of new observers.
    ///
    /// Existing observers keep working; only wrapping of new values is
    /// suspended.
    pub fn toggle_observing(value: bool) {
        RUNTIME.with(|rt| rt.borrow_mut().should_observe = value);
    }

    /// Whether new values may currently be observed.
    pub fn should_observe() -> bool {
        RUNTIME.with(|rt| rt.borrow().should_observe)
    }

    /// Install or remove the scheduler.
    pub fn set_scheduler(scheduler: Option<Rc<dyn Scheduler>>) {
        RUNTIME.with(|rt| rt.borrow_mut().scheduler = scheduler);
    }

    /// Hand a notified watcher to the scheduler, or run it now.
    pub fn queue_watcher(watcher: Watcher) {
        let scheduler = RUNTIME.with(|rt| rt.borrow().scheduler.clone());
        match scheduler {
            Some(scheduler) => scheduler.queue(watcher),
            None => watcher.run(),
        }
    }

    /// Install the error-reporting hook.
    pub fn set_error_handler<F>(handler: F)
    where
        F: Fn(&ReactiveError, Option<&Object>, &str) + 'static,
    {
        RUNTIME.with(|rt| rt.borrow_mut().error_handler = Some(Rc::new(handler)));
    }

    /// Remove the error-reporting hook.
    pub fn clear_error_handler() {
        RUNTIME.with(|rt| rt.borrow_mut().error_handler = None);
    }

    /// Report an error raised by user code.
    pub fn handle_error(err: &ReactiveError, context: Option<&Object>, info: &str) {
        let handler = RUNTIME.with(|rt| rt.borrow().error_handler.clone());
        match handler {
            Some(handler) => handler(err, context, info),
            None => error!(target: "ripple", info = %info, error = %err, "error in user code"),
        }
    }

    /// Install the warning hook.
    pub fn set_warn_handler<F>(handler: F)
    where
        F: Fn(&str, Option<&Object>) + 'static,
    {
        RUNTIME.with(|rt| rt.borrow_mut().warn_handler = Some(Rc::new(handler)));
    }

    /// Remove the warning hook.
    pub fn clear_warn_handler() {
        RUNTIME.with(|rt| rt.borrow_mut().warn_handler = None);
    }

    /// Report a configuration warning.
    ///
    /// Dropped entirely in production or silent mode.
    pub fn warn(message: &str, context: Option<&Object>) {
        let (config, handler) = RUNTIME.with(|rt| {
            let rt = rt.borrow();
            (rt.config, rt.warn_handler.clone())
        });
        if config.production || config.silent {
            return;
        }
        match handler {
            Some(handler) => handler(message, context),
            None => warn!(target: "ripple", "{}", message),
        }
    }
}

/// Enable or disable creation of new observers on this thread.
pub fn toggle_observing(value: bool) {
    Runtime::toggle_observing(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn observing_switch_round_trips() {
        assert!(Runtime::should_observe());
        toggle_observing(false);
        assert!(!Runtime::should_observe());
        toggle_observing(true);
        assert!(Runtime::should_observe());
    }

    #[test]
    fn warnings_reach_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        Runtime::set_warn_handler(move |msg, _| sink.borrow_mut().push(msg.to_string()));

        Runtime::warn("first", None);
        Runtime::configure(|cfg| cfg.production = true);
        Runtime::warn("suppressed", None);
        Runtime::configure(|cfg| {
            cfg.production = false;
            cfg.silent = true;
        });
        Runtime::warn("also suppressed", None);

        assert_eq!(*seen.borrow(), vec!["first".to_string()]);
        Runtime::clear_warn_handler();
    }

    #[test]
    fn errors_reach_handler_with_label() {
        let label = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&label);
        Runtime::set_error_handler(move |err, _, info| {
            *sink.borrow_mut() = format!("{info}: {err}");
        });

        Runtime::handle_error(&ReactiveError::callback("bad"), None, "data()");
        assert_eq!(*label.borrow(), "data(): bad");
        Runtime::clear_error_handler();
    }

    #[test]
    fn unhandled_errors_do_not_panic() {
        Runtime::handle_error(&ReactiveError::callback("logged"), None, "test");
    }

    #[test]
    fn configure_updates_in_place() {
        let calls = Cell::new(0);
        Runtime::configure(|cfg| {
            calls.set(calls.get() + 1);
            cfg.ordered_notify = true;
        });
        assert_eq!(calls.get(), 1);
        assert!(Runtime::config().ordered_notify);
    }
}

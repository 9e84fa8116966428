//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when an observed field is
//! read, the current computation is registered as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! When a watcher evaluates, it pushes itself onto the stack; when the
//! evaluation completes, it pops. Nested evaluation (a computed property read
//! during a render) simply pushes another entry.
//!
//! An entry may also be `None`. Pushing `None` suspends dependency collection
//! until it is popped, which is how user data initializers run without
//! capturing spurious dependencies.

use std::cell::RefCell;
use std::sync::Arc;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static TARGET_STACK: RefCell<Vec<Option<Arc<dyn Subscriber>>>> = RefCell::new(Vec::new());
}

/// Guard that pops the context when dropped.
///
/// This keeps the stack balanced even if the computation panics.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, any dependency that is read registers
    /// the subscriber. `None` disables collection for the guard's lifetime.
    pub fn enter(subscriber: Option<Arc<dyn Subscriber>>) -> Self {
        let subscriber_id = subscriber.as_ref().map(|s| s.id());
        Self::push(subscriber);
        Self { subscriber_id }
    }

    /// Enter a context that collects no dependencies.
    pub fn untracked() -> Self {
        Self::enter(None)
    }

    /// Push an entry onto the stack without a guard.
    ///
    /// Every `push` must be paired with a [`ReactiveContext::pop`].
    pub fn push(subscriber: Option<Arc<dyn Subscriber>>) {
        TARGET_STACK.with(|stack| stack.borrow_mut().push(subscriber));
    }

    /// Pop the top entry, returning the subscriber it held.
    pub fn pop() -> Option<Arc<dyn Subscriber>> {
        TARGET_STACK.with(|stack| stack.borrow_mut().pop().flatten())
    }

    /// The subscriber on top of the stack, if collection is enabled.
    pub fn current() -> Option<Arc<dyn Subscriber>> {
        TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// Check if a subscriber is currently collecting dependencies.
    pub fn is_active() -> bool {
        TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        TARGET_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.as_ref().map(|s| s.id()))
        })
    }

    /// Number of entries on the stack, including disabled ones.
    pub fn depth() -> usize {
        TARGET_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        TARGET_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch mismatched push/pop pairs early.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.as_ref().map(|s| s.id()),
                    self.subscriber_id,
                    "ReactiveContext mismatch"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Dependency;

    struct Stub(SubscriberId);

    impl Subscriber for Stub {
        fn id(&self) -> SubscriberId {
            self.0
        }

        fn add_dep(&self, _dep: &Dependency) {}

        fn update(&self) {}
    }

    fn stub() -> Arc<dyn Subscriber> {
        Arc::new(Stub(SubscriberId::new()))
    }

    #[test]
    fn context_tracks_subscriber() {
        let sub = stub();
        let id = sub.id();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(Some(sub));

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn nested_contexts() {
        let outer = stub();
        let inner = stub();
        let (id1, id2) = (outer.id(), inner.id());

        {
            let _ctx1 = ReactiveContext::enter(Some(outer));
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));

            {
                let _ctx2 = ReactiveContext::enter(Some(inner));
                assert_eq!(ReactiveContext::current_subscriber(), Some(id2));
            }

            // After inner context drops, outer should be current
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn untracked_entry_masks_outer_subscriber() {
        let outer = stub();
        let id = outer.id();
        let _ctx = ReactiveContext::enter(Some(outer));

        {
            let _pause = ReactiveContext::untracked();
            assert!(!ReactiveContext::is_active());
            assert!(ReactiveContext::current().is_none());
            assert_eq!(ReactiveContext::depth(), 2);
        }

        assert_eq!(ReactiveContext::current_subscriber(), Some(id));
    }

    #[test]
    fn manual_push_and_pop() {
        let sub = stub();
        let id = sub.id();

        ReactiveContext::push(Some(sub));
        assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        let popped = ReactiveContext::pop();
        assert_eq!(popped.map(|s| s.id()), Some(id));
        assert_eq!(ReactiveContext::depth(), 0);
    }
}

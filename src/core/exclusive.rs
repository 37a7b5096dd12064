//! # Per-instance mutual exclusion.
//!
//! Every strategy keeps all of its mutable state (registry, entry buffer, demand
//! counters, terminal flags) in one state object behind one [`Exclusive`] lock.
//!
//! ## Rules
//! - The lock is re-entrant for the owning thread: a subscriber callback or a
//!   push producer running inside a delivery pass may call back into the same
//!   strategy (`cancel`, `request` on another subscription, `emit`) without
//!   deadlocking. Other threads wait until the pass ends.
//! - The state itself is only borrowed inside [`Exclusive::with`]. User callbacks
//!   (subscribers, producers, feedback) are **never** invoked inside `with`; a
//!   strategy computes the next delivery under the borrow, releases it, then
//!   runs the callback while still holding the pass guard.
//!
//! ```text
//! let _pass = state.enter();                  // cross-thread exclusion for the pass
//! while let Some(d) = state.with(|s| s.next()) {
//!     d.run();                                // callback: may re-enter, borrow is free
//! }
//! ```

use std::cell::RefCell;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// Re-entrant lock around a strategy's state.
pub(crate) struct Exclusive<S> {
    cell: ReentrantMutex<RefCell<S>>,
}

impl<S> Exclusive<S> {
    pub(crate) fn new(state: S) -> Self {
        Self {
            cell: ReentrantMutex::new(RefCell::new(state)),
        }
    }

    /// Holds the instance lock for a whole delivery pass.
    pub(crate) fn enter(&self) -> ReentrantMutexGuard<'_, RefCell<S>> {
        self.cell.lock()
    }

    /// Runs `f` with exclusive access to the state. The borrow ends when `f` returns.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let guard = self.cell.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }
}

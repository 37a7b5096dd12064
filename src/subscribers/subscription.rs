//! # Demand subscription with re-entrant request coalescing.
//!
//! A [`Subscription`] is the per-subscriber handle for demand and cancellation.
//!
//! ## Request protocol
//! ```text
//! request(n <= 0)  ──► subscriber cancelled, one ProtocolViolation error delivered
//! request(n > 0)   ──► pass state?
//!                        ├─ Idle     ─► Running{pending: 0}
//!                        │             loop {
//!                        │               strategy.request(id, amount)
//!                        │               pending == 0 ? Idle, return : amount = take(pending)
//!                        │             }
//!                        └─ Running  ─► pending += n, return (the running pass drains it)
//! ```
//!
//! A nested `request` issued from inside `on_value`, or a concurrent one from
//! another thread, never re-enters delivery: it is merged into the accumulator of
//! the pass already in flight. Call depth stays constant and per-subscriber
//! order is preserved. A panic unwinding out of the pass resets it to `Idle`.
//!
//! ## Cancellation
//! `cancel()` is idempotent, may race with `request`, and removes the subscriber
//! from the strategy's registry (and therefore from every pending entry) before
//! returning.
//!
//! A subscription keeps its strategy alive. The strategy's registry keeps the
//! subscriber alive until cancellation or a terminal signal removes it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::SubscriberId;
use crate::error::FlowError;

/// Strategy-side entry points behind a subscription.
pub(crate) trait Demand: Send + Sync {
    /// Adds `n` to the subscriber's demand and delivers what it allows.
    fn request(&self, id: SubscriberId, n: u64) -> Result<(), FlowError>;

    /// Removes the subscriber. Idempotent.
    fn cancel(&self, id: SubscriberId);

    /// Removes the subscriber and fails it with a protocol violation.
    fn violate(&self, id: SubscriberId, requested: i64);
}

/// State of the delivery pass for one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Idle,
    Running { pending: u64 },
}

/// Returns the pass to `Idle` when a callback unwinds through it.
struct ResetOnUnwind<'a>(&'a Mutex<Pass>);

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            *self.0.lock() = Pass::Idle;
        }
    }
}

struct Inner {
    id: SubscriberId,
    target: Arc<dyn Demand>,
    pass: Mutex<Pass>,
    cancelled: AtomicBool,
}

/// Per-subscriber handle for demand (`request`) and `cancel`.
///
/// Cheap to clone; all clones drive the same subscription.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<Inner>,
}

/// Target of subscriptions handed out to rejected subscribers.
struct Detached;

impl Demand for Detached {
    fn request(&self, _id: SubscriberId, _n: u64) -> Result<(), FlowError> {
        Ok(())
    }
    fn cancel(&self, _id: SubscriberId) {}
    fn violate(&self, _id: SubscriberId, _requested: i64) {}
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, target: Arc<dyn Demand>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id,
                target,
                pass: Mutex::new(Pass::Idle),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// A subscription that is already cancelled and ignores every call.
    pub(crate) fn detached() -> Self {
        let sub = Self::new(SubscriberId::DETACHED, Arc::new(Detached));
        sub.inner.cancelled.store(true, Ordering::Release);
        sub
    }

    /// Returns the subscriber's handle within its strategy instance.
    pub fn id(&self) -> u64 {
        self.inner.id.get()
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Authorizes `n` more values.
    ///
    /// - `n <= 0` cancels the subscription and delivers one
    ///   [`FlowError::ProtocolViolation`] to the subscriber.
    /// - Demand accumulates and saturates at `u64::MAX` (effectively unbounded).
    /// - A panic escaping a callback ends the pass; later requests start a new one.
    ///
    /// # Errors
    /// Returns [`FlowError::LagExceeded`] when a shared pull publisher configured
    /// with [`LagPolicy::Throw`](crate::LagPolicy::Throw) overflows while serving
    /// this request. Nested requests merged into a failing pass are discarded.
    pub fn request(&self, n: i64) -> Result<(), FlowError> {
        if self.is_cancelled() {
            return Ok(());
        }
        let target = &self.inner.target;
        if n <= 0 {
            self.inner.cancelled.store(true, Ordering::Release);
            target.violate(self.inner.id, n);
            return Ok(());
        }

        {
            let mut pass = self.inner.pass.lock();
            match &mut *pass {
                Pass::Running { pending } => {
                    *pending = pending.saturating_add(n as u64);
                    return Ok(());
                }
                Pass::Idle => *pass = Pass::Running { pending: 0 },
            }
        }

        let _reset = ResetOnUnwind(&self.inner.pass);
        let mut amount = n as u64;
        loop {
            let outcome = target.request(self.inner.id, amount);
            let mut pass = self.inner.pass.lock();
            if outcome.is_err() {
                *pass = Pass::Idle;
                return outcome;
            }
            match &mut *pass {
                Pass::Running { pending } if *pending > 0 => {
                    amount = std::mem::take(pending);
                }
                _ => {
                    *pass = Pass::Idle;
                    return Ok(());
                }
            }
        }
    }

    /// Cancels the subscription. Idempotent; no callback follows once it returns.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.target.cancel(self.inner.id);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id.get())
            .field("pass", &*self.inner.pass.lock())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    /// Records calls and re-enters the subscription from inside `request`.
    #[derive(Default)]
    struct Script {
        calls: Mutex<Vec<u64>>,
        cancels: Mutex<u32>,
        violations: Mutex<Vec<i64>>,
        reenter: OnceLock<Subscription>,
        panic_on_first: bool,
        depth: Mutex<u32>,
        max_depth: Mutex<u32>,
    }

    impl Demand for Script {
        fn request(&self, _id: SubscriberId, n: u64) -> Result<(), FlowError> {
            {
                let mut depth = self.depth.lock();
                *depth += 1;
                let mut max = self.max_depth.lock();
                *max = (*max).max(*depth);
            }
            let first = {
                let mut calls = self.calls.lock();
                calls.push(n);
                calls.len() == 1
            };
            if first && self.panic_on_first {
                *self.depth.lock() -= 1;
                panic!("callback failed");
            }
            if first {
                if let Some(sub) = self.reenter.get() {
                    sub.request(2).unwrap();
                    sub.request(3).unwrap();
                }
            }
            *self.depth.lock() -= 1;
            Ok(())
        }

        fn cancel(&self, _id: SubscriberId) {
            *self.cancels.lock() += 1;
        }

        fn violate(&self, _id: SubscriberId, requested: i64) {
            self.violations.lock().push(requested);
        }
    }

    fn wire(script: &Arc<Script>) -> Subscription {
        let target: Arc<dyn Demand> = Arc::clone(script) as Arc<dyn Demand>;
        Subscription::new(SubscriberId::new(1), target)
    }

    #[test]
    fn test_nested_requests_are_coalesced() {
        let script = Arc::new(Script::default());
        let sub = wire(&script);
        script.reenter.set(sub.clone()).unwrap();

        sub.request(1).unwrap();

        assert_eq!(*script.calls.lock(), vec![1, 5]);
        assert_eq!(*script.max_depth.lock(), 1, "delivery must not recurse");
    }

    #[test]
    fn test_non_positive_request_violates_once() {
        let script = Arc::new(Script::default());
        let sub = wire(&script);

        sub.request(0).unwrap();
        sub.request(-5).unwrap();
        sub.request(4).unwrap();

        assert_eq!(*script.violations.lock(), vec![0]);
        assert!(script.calls.lock().is_empty());
        assert!(sub.is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let script = Arc::new(Script::default());
        let sub = wire(&script);
        let clone = sub.clone();

        sub.cancel();
        clone.cancel();
        sub.request(3).unwrap();

        assert_eq!(*script.cancels.lock(), 1);
        assert!(script.calls.lock().is_empty());
    }

    #[test]
    fn test_detached_subscription_is_cancelled() {
        let sub = Subscription::detached();
        assert!(sub.is_cancelled());
        assert!(sub.request(10).is_ok());
    }

    #[test]
    fn test_panicking_pass_does_not_wedge_subscription() {
        let script = Arc::new(Script {
            panic_on_first: true,
            ..Script::default()
        });
        let sub = wire(&script);

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sub.request(1)));
        assert!(unwound.is_err());
        assert_eq!(*sub.inner.pass.lock(), Pass::Idle);

        sub.request(3).unwrap();
        assert_eq!(*script.calls.lock(), vec![1, 3]);
    }
}

//! # Subscriber trait.
//!
//! [`Subscriber`] is the consumer side of the publisher contract. A publisher
//! calls, in order:
//!
//! ```text
//! on_subscribe(subscription)          exactly once
//! on_value(v)*                        at most the requested amount, in emission order
//! on_error(e) | on_complete()         at most once, nothing afterwards
//! ```
//!
//! ## Rules
//! - Callbacks may run on any thread that drives the publisher (the thread
//!   calling `subscribe`/`request`/`cancel`, or a push producer's thread).
//! - Callbacks may call back into the subscription (`request`, `cancel`) and into
//!   other publishers; a nested `request` on the same subscription is merged into
//!   the pass already in progress.
//! - After `cancel()` returns, no further callback is made.
//!
//! ## Example
//! ```rust
//! use std::sync::Mutex;
//! use backflow::{FlowError, Subscriber, Subscription};
//!
//! #[derive(Default)]
//! struct Sum {
//!     total: Mutex<u64>,
//! }
//!
//! impl Subscriber<u64> for Sum {
//!     fn on_subscribe(&self, subscription: Subscription) {
//!         let _ = subscription.request(i64::MAX);
//!     }
//!     fn on_value(&self, value: u64) {
//!         *self.total.lock().unwrap() += value;
//!     }
//!     fn on_error(&self, _error: FlowError) {}
//!     fn on_complete(&self) {}
//!     fn name(&self) -> &'static str { "sum" }
//! }
//! ```

use crate::error::FlowError;
use crate::subscribers::Subscription;

/// Consumer of a publisher's signals.
pub trait Subscriber<T>: Send + Sync + 'static {
    /// Receives the subscription handle. Nothing is delivered before demand is requested.
    fn on_subscribe(&self, subscription: Subscription);

    /// Receives one value. Called at most as many times as requested.
    fn on_value(&self, value: T);

    /// Receives the terminal error.
    fn on_error(&self, error: FlowError);

    /// Receives the terminal completion.
    fn on_complete(&self);

    /// Returns the subscriber name used in events and logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

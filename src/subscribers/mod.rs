//! # Subscriber contract.
//!
//! This module provides the consumer side of the publisher contract:
//! - [`Subscriber`] receives `on_subscribe`, `on_value`, `on_error`, `on_complete`;
//! - [`Subscription`] is the handle used to `request(n)` demand and `cancel()`.
//!
//! ## Architecture
//! ```text
//! Publisher::subscribe(subscriber)
//!     │
//!     ▼
//! strategy registers subscriber ──► on_subscribe(Subscription)
//!                                          │
//!          ┌───────────────────────────────┘
//!          ▼
//!   subscription.request(n) ──► strategy delivers ≤ n values ──► on_value(v)…
//!   subscription.cancel()   ──► strategy forgets subscriber (no further callbacks)
//! ```

mod subscriber;
mod subscription;

pub use subscriber::Subscriber;
pub use subscription::Subscription;

pub(crate) use subscription::Demand;

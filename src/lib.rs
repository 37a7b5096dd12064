//! # backflow
//!
//! **Backflow** is a backpressure-aware publish/subscribe engine.
//!
//! Producers emit a sequence of [`Signal`]s (values, then at most one error or
//! completion); subscribers receive them under an explicit demand protocol, so
//! no subscriber is overwhelmed and no producer blocks indefinitely. The crate
//! is a building block for streaming abstractions such as [`Single`],
//! [`Swarm`] and [`SignalStream`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐
//!     │  PullConfig  │   │  PushConfig  │
//!     │ (puller fn)  │   │ (producer fn)│
//!     └──────┬───────┘   └──────┬───────┘
//!            └────────┬─────────┘
//!                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Publisher (facade)                                               │
//! │  - capacity == 0      → fresh direct strategy per subscriber      │
//! │  - capacity > 0 | None → one shared strategy for all subscribers  │
//! └──────┬──────────────────┬──────────────────┬──────────────────┬───┘
//!        ▼                  ▼                  ▼                  ▼
//!   ┌──────────┐      ┌──────────┐      ┌────────────┐     ┌────────────┐
//!   │DirectPull│      │DirectPush│      │ SharedPull │     │ SharedPush │
//!   │          │      │ backpr.  │      │ buffer+lag │     │buffer+backp│
//!   └────┬─────┘      └────┬─────┘      └─────┬──────┘     └─────┬──────┘
//!        │ Publishes events: Subscribed, ValueDropped, LagErrored, ...
//!        ▼                  ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  ObserverSet listener  │
//!                       └───┬────────┬───────┬───┘
//!                           ▼        ▼       ▼
//!                        worker1  worker2  workerN  ──► obs.on_event()
//! ```
//!
//! ### Demand protocol
//! ```text
//! subscribe(s) ──► s.on_subscribe(subscription)
//!
//! subscription.request(n)
//!   ├─ n <= 0        ─► cancelled, on_error(ProtocolViolation)
//!   ├─ pass running  ─► merged into the running pass (no recursion)
//!   └─ otherwise     ─► demand += n
//!                       ├─ shared: backlog first, then one pull for the shortfall
//!                       ├─ direct: one pull for the outstanding demand
//!                       └─ push:   parked value, resume, lazy start
//!
//! on_value × k (k <= demand) ─► [on_error | on_complete] (at most once, after backlog)
//!
//! subscription.cancel() ─► removed at once, no callback afterwards
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Publishing**    | Configure and build publishers, subscribe to them.           | [`Publisher`], [`PublisherConfig`]          |
//! | **Subscribing**   | Receive signals and control demand.                          | [`Subscriber`], [`Subscription`]            |
//! | **Producers**     | Pull functions, push emitters and producer feedback.         | [`Emitter`], [`Feedback`], [`Valve`]        |
//! | **Policies**      | What happens when supply and demand diverge.                 | [`LagPolicy`], [`BackpressurePolicy`]       |
//! | **Streams**       | Single/multi-value publishers and a `Stream` adapter.        | [`Single`], [`Swarm`], [`SignalStream`]     |
//! | **Observability** | Engine events and async observers.                           | [`Bus`], [`Event`], [`Observe`]             |
//! | **Errors**        | Typed error carried by error signals and throwing policies.  | [`FlowError`]                               |
//!
//! ## Optional features
//! - `logging`: exports a `tracing`-backed [`LogWriter`] observer _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use backflow::{FlowError, LagPolicy, Publisher, PullConfig, Subscriber, Subscription};
//! use parking_lot::Mutex;
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<u32>>);
//!
//! impl Subscriber<u32> for Collect {
//!     fn on_subscribe(&self, s: Subscription) { let _ = s.request(2); }
//!     fn on_value(&self, v: u32) { self.0.lock().push(v); }
//!     fn on_error(&self, _e: FlowError) {}
//!     fn on_complete(&self) {}
//! }
//!
//! // Shared pull publisher: one puller, per-subscriber cursors over a bounded buffer.
//! let publisher = Publisher::builder(
//!     PullConfig::iterate(|| 1..=10).with_capacity(16).with_lag(LagPolicy::Drop),
//! )
//! .name("numbers")
//! .build();
//!
//! let a = Arc::new(Collect::default());
//! let b = Arc::new(Collect::default());
//! publisher.subscribe(a.clone());
//! publisher.subscribe(b.clone());
//!
//! // `b` joined after 1 and 2 were buffered for `a`, so its cursor starts at 3.
//! assert_eq!(*a.0.lock(), vec![1, 2]);
//! assert_eq!(*b.0.lock(), vec![3, 4]);
//! ```
mod core;
mod error;
mod events;
mod observers;
mod policies;
mod producers;
mod signal;
mod strategies;
mod streams;
mod subscribers;

#[cfg(test)]
mod test_support;

// ---- Public re-exports ----

pub use core::{Publisher, PublisherBuilder, PublisherConfig, PullConfig, PushConfig, DEFAULT_CAPACITY};
pub use error::FlowError;
pub use events::{Bus, Event, EventKind};
pub use observers::{Observe, ObserverSet};
pub use policies::{BackpressurePolicy, LagPolicy};
pub use producers::{iter_puller, Emitter, Feedback, PullFactory, Puller, PushProducer, Valve, ValveState};
pub use signal::Signal;
pub use strategies::StrategyKind;
pub use streams::{SignalStream, Single, Swarm};
pub use subscribers::{Subscriber, Subscription};

// Optional: expose a tracing-backed logging observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;

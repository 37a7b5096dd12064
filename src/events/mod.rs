//! Engine events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to observe
//! what publisher strategies decide: subscriptions, cancellations, policy
//! decisions and terminations.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the four strategies (through their shared `Telemetry`
//!   handle) and `ObserverSet` workers (overflow/panic).
//! - **Consumers**: [`ObserverSet`](crate::ObserverSet) listeners, or any caller
//!   of [`Bus::subscribe`].
//!
//! Publishing is synchronous and never blocks, so strategies publish while
//! holding their instance lock.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

pub(crate) use bus::Telemetry;

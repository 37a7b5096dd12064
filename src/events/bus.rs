//! # Event bus for broadcasting engine events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from any thread, including from under a
//! strategy's instance lock.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Consumers (many):
//!   DirectPull  ──┐
//!   DirectPush  ──┼──────► Bus ───────► ObserverSet listener ──► observers
//!   SharedPull  ──┤  (broadcast chan)
//!   SharedPush  ──┘                ───► bus.subscribe() (tests, custom tooling)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **No runtime required to publish**: strategies are synchronous.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::event::{Event, EventKind};

/// Broadcast channel for engine events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately (send clones internally).
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Default ring buffer size.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a new bus with the given channel capacity.
    ///
    /// ### Notes
    /// - Capacity is **shared** across all receivers (not per-receiver).
    /// - The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Bus::new(Self::DEFAULT_CAPACITY)
    }
}

/// Per-strategy event sink: publisher name plus optional bus.
///
/// Every event is also recorded as a `tracing` trace record, so strategies stay
/// observable without a bus.
#[derive(Clone, Debug)]
pub(crate) struct Telemetry {
    name: Arc<str>,
    bus: Option<Bus>,
}

impl Telemetry {
    pub(crate) fn new(name: Arc<str>, bus: Option<Bus>) -> Self {
        Self { name, bus }
    }

    /// Starts an event of `kind` already tagged with the publisher name.
    #[inline]
    pub(crate) fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_publisher(Arc::clone(&self.name))
    }

    pub(crate) fn publish(&self, ev: Event) {
        tracing::trace!(
            publisher = %self.name,
            kind = ?ev.kind,
            subscriber = ?ev.subscriber,
            reason = ?ev.reason,
            "flow event"
        );
        if let Some(bus) = &self.bus {
            bus.publish(ev);
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

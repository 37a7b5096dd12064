//! # Events emitted by publisher strategies and observer workers.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Membership events**: subscribers attaching, being rejected or cancelled
//! - **Policy events**: lag and backpressure decisions
//! - **Terminal events**: completion and failure of a publisher
//!
//! The [`Event`] struct carries additional metadata such as the publisher name,
//! subscriber name and handle, reasons and capacities.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use backflow::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::LagErrored)
//!     .with_publisher("quotes")
//!     .with_subscriber("dashboard", 7)
//!     .with_capacity(2);
//!
//! assert_eq!(ev.kind, EventKind::LagErrored);
//! assert_eq!(ev.publisher.as_deref(), Some("quotes"));
//! assert_eq!(ev.subscriber_id, Some(7));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Membership events ===
    /// Subscriber attached to a strategy.
    ///
    /// Sets:
    /// - `publisher`, `subscriber`, `subscriber_id`
    Subscribed,

    /// Subscriber could not attach (direct strategy occupied).
    ///
    /// Sets:
    /// - `publisher`, `subscriber`, `reason`
    Rejected,

    /// Subscriber cancelled its subscription.
    ///
    /// Sets:
    /// - `publisher`, `subscriber`, `subscriber_id`
    Cancelled,

    /// `request(n)` called with `n <= 0`; the subscriber was cancelled and failed.
    ///
    /// Sets:
    /// - `publisher`, `subscriber`, `subscriber_id`, `requested`
    ProtocolViolation,

    // === Policy events ===
    /// A pushed value was discarded (`BackpressurePolicy::Drop`, or a producer
    /// ignoring a pause, or a pull batch larger than the demand).
    ///
    /// Sets:
    /// - `publisher`, `reason`, optionally `subscriber`/`subscriber_id`
    ValueDropped,

    /// Producer asked to pause (`BackpressurePolicy::Pause`).
    ProducerPaused,

    /// Producer resumed after demand or buffer space became available.
    ProducerResumed,

    /// Producer asked to stop (cancel, `Stop`/`Error`/`Throw` policies).
    ProducerStopped,

    /// Oldest shared entry retired under `LagPolicy::Drop`.
    ///
    /// Sets:
    /// - `publisher`, `capacity`
    LagDropped,

    /// Lagging subscriber failed under `LagPolicy::Error`.
    ///
    /// Sets:
    /// - `publisher`, `subscriber`, `subscriber_id`, `capacity`
    LagErrored,

    /// Overflow surfaced as an error (`Error`/`Throw` policies, lag or backpressure).
    ///
    /// Sets:
    /// - `publisher`, `capacity`, `reason` (policy label)
    BackpressureExceeded,

    // === Terminal events ===
    /// Publisher (or direct subscriber session) accepted a completion.
    Completed,

    /// Publisher (or direct subscriber session) accepted an error.
    ///
    /// Sets:
    /// - `publisher`, `reason`
    Failed,

    // === Observer events ===
    /// Observer dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: observer name
    /// - `reason`: "full" or "closed"
    ObserverOverflow,

    /// Observer panicked while handling an event.
    ///
    /// Sets:
    /// - `subscriber`: observer name
    /// - `reason`: panic message
    ObserverPanicked,
}

/// Engine event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the publisher that emitted the event.
    pub publisher: Option<Arc<str>>,
    /// Subscriber (or observer) name.
    pub subscriber: Option<Arc<str>>,
    /// Registry handle of the subscriber within its strategy instance.
    pub subscriber_id: Option<u64>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Capacity in effect for policy events.
    pub capacity: Option<usize>,
    /// Offending request amount for protocol violations.
    pub requested: Option<i64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            publisher: None,
            subscriber: None,
            subscriber_id: None,
            reason: None,
            capacity: None,
            requested: None,
        }
    }

    /// Attaches the publisher name.
    #[inline]
    pub fn with_publisher(mut self, publisher: impl Into<Arc<str>>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// Attaches the subscriber name and its registry handle.
    #[inline]
    pub fn with_subscriber(mut self, name: impl Into<Arc<str>>, id: u64) -> Self {
        self.subscriber = Some(name.into());
        self.subscriber_id = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a capacity.
    #[inline]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Attaches the offending request amount.
    #[inline]
    pub fn with_requested(mut self, n: i64) -> Self {
        self.requested = Some(n);
        self
    }

    /// Creates an observer overflow event.
    #[inline]
    pub fn observer_overflow(observer: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::ObserverOverflow)
            .with_reason(format!("observer={observer} reason={reason}"));
        ev.subscriber = Some(observer.into());
        ev
    }

    /// Creates an observer panic event.
    #[inline]
    pub fn observer_panicked(observer: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::ObserverPanicked).with_reason(info);
        ev.subscriber = Some(observer.into());
        ev
    }

    #[inline]
    pub fn is_observer_overflow(&self) -> bool {
        matches!(self.kind, EventKind::ObserverOverflow)
    }

    /// Returns `true` for events that end a publisher or subscriber session.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::Completed | EventKind::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::Subscribed);
        let b = Event::new(EventKind::Cancelled);
        assert!(b.seq > a.seq, "seq must increase: {} then {}", a.seq, b.seq);
    }

    #[test]
    fn test_builders_fill_metadata() {
        let ev = Event::new(EventKind::ProtocolViolation)
            .with_publisher("orders")
            .with_subscriber("audit", 3)
            .with_requested(-5);
        assert_eq!(ev.publisher.as_deref(), Some("orders"));
        assert_eq!(ev.subscriber.as_deref(), Some("audit"));
        assert_eq!(ev.subscriber_id, Some(3));
        assert_eq!(ev.requested, Some(-5));
        assert!(!ev.is_terminal());
    }

    #[test]
    fn test_observer_overflow_helper() {
        let ev = Event::observer_overflow("log", "full");
        assert!(ev.is_observer_overflow());
        assert_eq!(ev.subscriber.as_deref(), Some("log"));
        assert_eq!(ev.reason.as_deref(), Some("observer=log reason=full"));
    }
}

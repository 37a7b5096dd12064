//! # Logging observer for debugging and demos.
//!
//! [`LogWriter`] turns engine events into `tracing` records: failures and lag
//! errors at `warn`, policy decisions at `debug`, membership at `info`.
//!
//! ## Output format (with a `fmt` subscriber)
//! ```text
//! INFO  backflow: subscribed publisher="quotes" subscriber="dashboard" id=1
//! DEBUG backflow: value dropped publisher="quotes" reason="demand exhausted"
//! WARN  backflow: lag error publisher="quotes" subscriber="dashboard" capacity=2
//! INFO  backflow: completed publisher="quotes"
//! ```
//!
//! ## Example
//! ```no_run
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use std::sync::Arc;
//! use backflow::{Bus, LogWriter, Observe, ObserverSet};
//!
//! let bus = Bus::default();
//! let writers: Vec<Arc<dyn Observe>> = vec![Arc::new(LogWriter::new())];
//! let observers = ObserverSet::attach(&bus, writers);
//! // ... build publishers with `.with_bus(bus.clone())` ...
//! observers.shutdown().await;
//! # }
//! ```

use async_trait::async_trait;

use super::Observe;
use crate::events::{Event, EventKind};

/// `tracing`-backed logging observer.
///
/// Enabled via the `logging` feature. Not intended for production metrics:
/// implement a custom [`Observe`] for that.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let publisher = e.publisher.as_deref().unwrap_or("-");
        let subscriber = e.subscriber.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::Subscribed => {
                tracing::info!(publisher, subscriber, id = ?e.subscriber_id, "subscribed");
            }
            EventKind::Rejected => {
                tracing::info!(publisher, subscriber, reason, "subscription rejected");
            }
            EventKind::Cancelled => {
                tracing::info!(publisher, subscriber, id = ?e.subscriber_id, "cancelled");
            }
            EventKind::ProtocolViolation => {
                tracing::warn!(publisher, subscriber, requested = ?e.requested, "protocol violation");
            }
            EventKind::ValueDropped => {
                tracing::debug!(publisher, subscriber, reason, "value dropped");
            }
            EventKind::ProducerPaused => tracing::debug!(publisher, "producer paused"),
            EventKind::ProducerResumed => tracing::debug!(publisher, "producer resumed"),
            EventKind::ProducerStopped => tracing::debug!(publisher, reason, "producer stopped"),
            EventKind::LagDropped => {
                tracing::debug!(publisher, capacity = ?e.capacity, "lag drop");
            }
            EventKind::LagErrored => {
                tracing::warn!(publisher, subscriber, capacity = ?e.capacity, "lag error");
            }
            EventKind::BackpressureExceeded => {
                tracing::warn!(publisher, capacity = ?e.capacity, reason, "backpressure exceeded");
            }
            EventKind::Completed => tracing::info!(publisher, "completed"),
            EventKind::Failed => tracing::warn!(publisher, reason, "failed"),
            EventKind::ObserverOverflow => tracing::warn!(observer = subscriber, reason, "observer overflow"),
            EventKind::ObserverPanicked => tracing::warn!(observer = subscriber, reason, "observer panicked"),
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

//! # Event observer trait.
//!
//! Provides [`Observe`], the extension point for plugging custom event handlers
//! (metrics, audit, alerting) into the engine's event [`Bus`](crate::Bus).
//!
//! Each observer gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-observer bounded queue** (capacity via [`Observe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `EventKind::ObserverPanicked`)
//!
//! ## Architecture
//! ```text
//! ObserverSet ──► [bounded queue] ──► worker task ──► observer.on_event()
//!                                  └─► panic caught → EventKind::ObserverPanicked
//! ```
//!
//! ## Rules
//! - A slow observer only affects its own queue.
//! - Queue overflow drops the event **for this observer only** and publishes
//!   `EventKind::ObserverOverflow`.
//! - Events are processed sequentially (FIFO) per observer.
//! - Observers never block publishers: strategies publish synchronously and move on.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use backflow::{Event, EventKind, Observe};
//!
//! struct LagAlerts;
//!
//! #[async_trait]
//! impl Observe for LagAlerts {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::LagErrored) {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "lag-alerts" }
//!     fn queue_capacity(&self) -> usize { 64 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Asynchronous consumer of engine events.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Processes a single event, from the observer's own worker task.
    async fn on_event(&self, event: &Event);

    /// Returns the observer name used in overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this observer (clamped to ≥ 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

//! # Backpressure policies for push publishers.
//!
//! [`BackpressurePolicy`] decides what happens when a push producer emits a value
//! that cannot be accepted:
//! - **direct push**: the subscriber has no outstanding demand;
//! - **shared push**: the bounded entry buffer is full.
//!
//! ## Choosing the right policy
//!
//! **Lossy feeds** (metrics, ticks, UI refresh):
//! ```text
//! BackpressurePolicy::Drop   → value discarded, production continues
//! ```
//!
//! **Cooperative producers** (can stop calling back on request):
//! ```text
//! BackpressurePolicy::Pause  → feedback.pause(), feedback.resume() once there is room (default)
//! ```
//!
//! **Bounded sessions**:
//! ```text
//! BackpressurePolicy::Stop   → feedback.stop(), subscribers complete normally
//! BackpressurePolicy::Error  → feedback.stop(), subscribers fail with BackpressureExceeded
//! BackpressurePolicy::Throw  → feedback.stop(), emit() returns Err(BackpressureExceeded)
//! ```

/// Policy applied by push publishers when a value cannot be accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BackpressurePolicy {
    /// Discard the value; production continues.
    Drop,
    /// Ask the producer to pause until the publisher resumes it (default).
    #[default]
    Pause,
    /// Stop the producer and complete.
    Stop,
    /// Stop the producer and fail with [`FlowError::BackpressureExceeded`](crate::FlowError::BackpressureExceeded).
    Error,
    /// Stop the producer and fail the producer's own `emit` call.
    Throw,
}

impl BackpressurePolicy {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BackpressurePolicy::Drop => "backpressure_drop",
            BackpressurePolicy::Pause => "backpressure_pause",
            BackpressurePolicy::Stop => "backpressure_stop",
            BackpressurePolicy::Error => "backpressure_error",
            BackpressurePolicy::Throw => "backpressure_throw",
        }
    }

    /// Returns `true` if the policy terminates the publisher (or subscriber) on overflow.
    ///
    /// `Drop` and `Pause` recover locally.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BackpressurePolicy::Stop | BackpressurePolicy::Error | BackpressurePolicy::Throw
        )
    }
}

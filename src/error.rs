//! Error types carried by error signals and returned by throwing policies.
//!
//! [`FlowError`] is the single error enum of the engine. It travels in two ways:
//!
//! - as the payload of [`Signal::Error`](crate::Signal::Error), delivered to a
//!   subscriber through [`Subscriber::on_error`](crate::Subscriber::on_error);
//! - as the `Err` of [`Subscription::request`](crate::Subscription::request) or
//!   [`Emitter::emit`](crate::Emitter::emit) when a `Throw` policy fires.
//!
//! Like the rest of the crate it provides `as_label` / `as_message` helpers for
//! logging and metrics.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// # Errors produced by the publisher engine.
///
/// The type is `Clone`: shared strategies store one terminal error and hand a copy
/// to every subscriber still pending on it.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    /// `request(n)` was called with `n <= 0`.
    ///
    /// The subscription is cancelled and the subscriber receives this error once.
    #[error("request count must be > 0, given {requested}")]
    ProtocolViolation {
        /// The offending request amount.
        requested: i64,
    },

    /// A push producer outpaced the demand or buffer capacity of the publisher.
    #[error("backpressure exceeded (capacity {capacity})")]
    BackpressureExceeded {
        /// Capacity in effect when the overflow happened (`0` for direct strategies).
        capacity: usize,
    },

    /// A subscriber of a shared publisher fell behind the bounded entry buffer.
    #[error("subscriber lagged behind shared buffer (capacity {capacity})")]
    LagExceeded {
        /// Capacity of the shared entry buffer.
        capacity: usize,
    },

    /// A direct strategy instance already serves a subscriber.
    #[error("direct publisher already has an active subscriber")]
    Occupied,

    /// The producer emitted an error signal.
    #[error("producer failed: {0}")]
    Producer(Arc<dyn StdError + Send + Sync>),
}

impl FlowError {
    /// Wraps an arbitrary producer failure.
    ///
    /// # Example
    /// ```
    /// use backflow::FlowError;
    ///
    /// let err = FlowError::producer(std::io::Error::other("disk gone"));
    /// assert_eq!(err.as_label(), "producer_failed");
    /// assert_eq!(err.to_string(), "producer failed: disk gone");
    /// ```
    pub fn producer<E>(cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        FlowError::Producer(Arc::new(cause))
    }

    /// Builds a producer failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        FlowError::Producer(Arc::new(Message(message.into())))
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use backflow::FlowError;
    ///
    /// let err = FlowError::LagExceeded { capacity: 2 };
    /// assert_eq!(err.as_label(), "lag_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FlowError::ProtocolViolation { .. } => "protocol_violation",
            FlowError::BackpressureExceeded { .. } => "backpressure_exceeded",
            FlowError::LagExceeded { .. } => "lag_exceeded",
            FlowError::Occupied => "occupied",
            FlowError::Producer(_) => "producer_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            FlowError::ProtocolViolation { requested } => format!("invalid request: {requested}"),
            FlowError::BackpressureExceeded { capacity } => {
                format!("backpressure: capacity={capacity}")
            }
            FlowError::LagExceeded { capacity } => format!("lag: capacity={capacity}"),
            FlowError::Occupied => "occupied".to_string(),
            FlowError::Producer(cause) => format!("producer: {cause}"),
        }
    }

    /// Indicates whether the error was raised by a lag or backpressure policy
    /// rather than by the producer or the subscriber.
    pub fn is_policy(&self) -> bool {
        matches!(
            self,
            FlowError::BackpressureExceeded { .. } | FlowError::LagExceeded { .. }
        )
    }
}

/// Message-only producer failure.
#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

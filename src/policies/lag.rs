//! # Lag policies for shared pull publishers.
//!
//! [`LagPolicy`] determines what happens to **lagging** subscribers (those still
//! pending on the oldest buffered entry) when a new entry does not fit into the
//! bounded shared buffer.
//!
//! ```text
//! buffer: [e1 e2] cap=2      new value e3 arrives
//!          ▲
//!          └─ still pending for subscriber B
//!
//! LagPolicy::Drop   → e1 retired, B silently skips it
//! LagPolicy::Error  → e1 retired, B receives LagExceeded and is removed
//! LagPolicy::Throw  → request() that pulled e3 returns Err(LagExceeded)
//! ```
//!
//! Subscribers that already consumed the oldest entry are never affected.

/// Policy applied to lagging subscribers of a bounded shared buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LagPolicy {
    /// Retire the oldest entry; its pending subscribers never receive it.
    Drop,
    /// Retire the oldest entry and fail every subscriber still pending on it (default).
    #[default]
    Error,
    /// Fail the `request` call that triggered the overflow.
    Throw,
}

impl LagPolicy {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LagPolicy::Drop => "lag_drop",
            LagPolicy::Error => "lag_error",
            LagPolicy::Throw => "lag_throw",
        }
    }

    /// Returns `true` if the policy terminates the affected subscribers or the caller.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LagPolicy::Drop)
    }
}

//! Overflow policies.
//!
//! This module groups the knobs that decide **what happens when supply and
//! demand diverge**.
//!
//! ## Contents
//! - [`LagPolicy`] what a shared pull publisher does with subscribers that fall
//!   behind its bounded entry buffer (drop / error / throw)
//! - [`BackpressurePolicy`] what a push publisher does when the producer outpaces
//!   demand or capacity (drop / pause / stop / error / throw)
//!
//! ## Quick wiring
//! ```text
//! PublisherConfig::Pull { capacity, lag, .. }
//!      └─► shared pull strategy applies `lag` to the oldest entry on overflow
//! PublisherConfig::Push { capacity, backpressure, .. }
//!      ├─► direct push applies `backpressure` when demand == 0
//!      └─► shared push applies `backpressure` when the entry buffer is full
//! ```
//!
//! ## Defaults
//! - `LagPolicy::Error`
//! - `BackpressurePolicy::Pause`

mod backpressure;
mod lag;

pub use backpressure::BackpressurePolicy;
pub use lag::LagPolicy;

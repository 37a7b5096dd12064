//! Event observers: asynchronous consumers of the engine's [`Bus`](crate::Bus).
//!
//! - [`Observe`] the observer trait
//! - [`ObserverSet`] bus listener and per-observer workers
//! - [`LogWriter`] `tracing`-backed observer (feature `logging`)

#[cfg(feature = "logging")]
mod log;
mod observer;
mod set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use observer::Observe;
pub use set::ObserverSet;

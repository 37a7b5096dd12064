//! Producer contracts consumed by the strategies.
//!
//! ## Contents
//! - [`Puller`] / [`PullFactory`]: `(requested) -> Vec<Signal<T>>`, called
//!   synchronously from `request`; may return fewer signals than requested and
//!   may end early with a terminal signal.
//! - [`PushProducer`] / [`Emitter`]: started once, then calls
//!   `emitter.emit(signal, feedback)` from any thread.
//! - [`Feedback`]: `pause` / `resume` / `stop` hooks the publisher drives
//!   according to its [`BackpressurePolicy`](crate::BackpressurePolicy).
//! - [`Valve`]: ready-made feedback with a blocking `wait_open`.
//!
//! Producers are expected to be non-blocking generators: they run under the
//! strategy's instance lock.

mod pull;
mod push;

pub use pull::{iter_puller, PullFactory, Puller};
pub use push::{Emitter, Feedback, PushProducer, Valve, ValveState};

pub(crate) use push::PushSink;

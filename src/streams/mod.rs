//! Streaming abstractions built on the publisher facade.
//!
//! - [`Swarm`] publisher of any number of values
//! - [`Single`] publisher of at most one value, with a `value()` future
//! - [`SignalStream`] `futures::Stream` view of a publisher

mod single;
mod stream;
mod swarm;

pub use single::Single;
pub use stream::SignalStream;
pub use swarm::Swarm;

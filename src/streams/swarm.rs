//! # Multi-value publisher.
//!
//! [`Swarm`] is a [`Publisher`] of any number of values, with constructors for
//! the common cases and an async [`Stream`](futures::Stream) view.

use std::sync::Arc;

use crate::core::{Publisher, PublisherConfig, PullConfig};
use crate::subscribers::Subscriber;

use super::stream::SignalStream;

/// Publisher of zero or more values followed by one terminal signal.
///
/// # Example
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use futures::StreamExt;
/// use backflow::Swarm;
///
/// let got: Vec<_> = Swarm::from_values(vec![1, 2, 3]).into_stream().collect().await;
/// assert_eq!(got.into_iter().map(Result::unwrap).collect::<Vec<_>>(), vec![1, 2, 3]);
/// # }
/// ```
pub struct Swarm<T> {
    publisher: Publisher<T>,
}

impl<T: Clone + Send + 'static> Swarm<T> {
    pub fn new(config: impl Into<PublisherConfig<T>>) -> Self {
        Self::from_publisher(Publisher::new(config))
    }

    /// Wraps an existing (possibly named) publisher.
    pub fn from_publisher(publisher: Publisher<T>) -> Self {
        Self { publisher }
    }

    /// Completes as soon as the subscriber requests anything.
    pub fn empty() -> Self {
        Self::new(PullConfig::iterate(std::iter::empty::<T>).direct())
    }

    /// Replays `values` in order to every subscriber, each with its own cursor.
    pub fn from_values<I>(values: I) -> Self
    where
        T: Sync,
        I: IntoIterator<Item = T>,
    {
        let values: Arc<[T]> = values.into_iter().collect();
        Self::new(PullConfig::iterate(move || values.to_vec()).direct())
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.publisher.subscribe(subscriber);
    }

    /// Subscribes a stream adapter that requests one value per poll.
    pub fn into_stream(self) -> SignalStream<T> {
        SignalStream::subscribe(&self.publisher)
    }

    pub fn publisher(&self) -> &Publisher<T> {
        &self.publisher
    }
}

impl<T> Clone for Swarm<T> {
    fn clone(&self) -> Self {
        Self {
            publisher: self.publisher.clone(),
        }
    }
}

//! # Single-value publisher.
//!
//! [`Single`] delivers at most one value: the first value upstream produces is
//! followed by completion, and the upstream subscription is cancelled.
//!
//! ```text
//! upstream ──► FirstOnly ──► subscriber
//!   Value(v)      ├─ upstream.cancel()
//!                 ├─ on_value(v)
//!                 └─ on_complete()
//!   Error/Complete ─► forwarded once
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::core::{Publisher, PublisherConfig, PullConfig};
use crate::error::FlowError;
use crate::subscribers::{Subscriber, Subscription};

/// Publisher of at most one value.
///
/// # Example
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use backflow::Single;
///
/// assert!(matches!(Single::of(42).value().await, Ok(Some(42))));
/// assert!(matches!(Single::<u8>::empty().value().await, Ok(None)));
/// # }
/// ```
pub struct Single<T> {
    publisher: Publisher<T>,
}

impl<T: Clone + Send + 'static> Single<T> {
    /// Takes the first value of whatever `config` produces.
    pub fn new(config: impl Into<PublisherConfig<T>>) -> Self {
        Self::from_publisher(Publisher::new(config))
    }

    pub fn from_publisher(publisher: Publisher<T>) -> Self {
        Self { publisher }
    }

    pub fn of(value: T) -> Self
    where
        T: Sync,
    {
        Self::new(PullConfig::iterate(move || std::iter::once(value.clone())).direct())
    }

    pub fn empty() -> Self {
        Self::new(PullConfig::iterate(std::iter::empty::<T>).direct())
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.publisher.subscribe(Arc::new(FirstOnly::new(subscriber)));
    }

    /// Resolves to the value, `None` on completion without one, or the error.
    pub fn value(&self) -> impl Future<Output = Result<Option<T>, FlowError>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.subscribe(Arc::new(Capture {
            tx: Mutex::new(Some(tx)),
        }));
        async move { rx.await.unwrap_or(Ok(None)) }
    }
}

/// Forwards the first value and one terminal, then goes quiet.
struct FirstOnly<T> {
    downstream: Arc<dyn Subscriber<T>>,
    upstream: Mutex<Option<Subscription>>,
    done: AtomicBool,
}

impl<T> FirstOnly<T> {
    fn new(downstream: Arc<dyn Subscriber<T>>) -> Self {
        Self {
            downstream,
            upstream: Mutex::new(None),
            done: AtomicBool::new(false),
        }
    }

    fn finish(&self) -> bool {
        !self.done.swap(true, Ordering::AcqRel)
    }
}

impl<T: Send + 'static> Subscriber<T> for FirstOnly<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        *self.upstream.lock() = Some(subscription.clone());
        self.downstream.on_subscribe(subscription);
    }

    fn on_value(&self, value: T) {
        if !self.finish() {
            return;
        }
        let upstream = self.upstream.lock().take();
        if let Some(upstream) = upstream {
            upstream.cancel();
        }
        self.downstream.on_value(value);
        self.downstream.on_complete();
    }

    fn on_error(&self, error: FlowError) {
        if self.finish() {
            self.upstream.lock().take();
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if self.finish() {
            self.upstream.lock().take();
            self.downstream.on_complete();
        }
    }

    fn name(&self) -> &'static str {
        self.downstream.name()
    }
}

/// Sends the outcome of a [`Single`] through a oneshot.
struct Capture<T> {
    tx: Mutex<Option<oneshot::Sender<Result<Option<T>, FlowError>>>>,
}

impl<T> Capture<T> {
    fn send(&self, outcome: Result<Option<T>, FlowError>) {
        if let Some(tx) = self.tx.lock().take() {
            let _ = tx.send(outcome);
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for Capture<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        let _ = subscription.request(1);
    }

    fn on_value(&self, value: T) {
        self.send(Ok(Some(value)));
    }

    fn on_error(&self, error: FlowError) {
        self.send(Err(error));
    }

    fn on_complete(&self) {
        self.send(Ok(None));
    }

    fn name(&self) -> &'static str {
        "single"
    }
}

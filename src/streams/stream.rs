//! # Stream adapter.
//!
//! [`SignalStream`] subscribes to a publisher and exposes it as a
//! [`futures::Stream`]. Demand follows polling: one value is requested per
//! poll that finds the queue empty, so a stream that is not polled never
//! receives more than one value ahead.
//!
//! ```text
//! poll_next ──► queue non-empty? ──► Ready(item)
//!        └────► terminal seen?   ──► Ready(None)
//!        └────► no request out   ──► request(1) (may deliver synchronously)
//!        └────► Pending          ◄── on_value/on_error/on_complete wake
//! ```
//!
//! Dropping the stream cancels the subscription.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::task::AtomicWaker;
use futures::Stream;
use parking_lot::Mutex;

use crate::core::Publisher;
use crate::error::FlowError;
use crate::subscribers::{Subscriber, Subscription};

struct Queue<T> {
    items: VecDeque<Result<T, FlowError>>,
    subscription: Option<Subscription>,
    outstanding: bool,
    done: bool,
}

struct Shared<T> {
    queue: Mutex<Queue<T>>,
    waker: AtomicWaker,
}

/// Subscriber half of the adapter.
struct Tap<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Subscriber<T> for Tap<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        self.shared.queue.lock().subscription = Some(subscription);
    }

    fn on_value(&self, value: T) {
        {
            let mut q = self.shared.queue.lock();
            q.items.push_back(Ok(value));
            q.outstanding = false;
        }
        self.shared.waker.wake();
    }

    fn on_error(&self, error: FlowError) {
        {
            let mut q = self.shared.queue.lock();
            q.items.push_back(Err(error));
            q.done = true;
            q.subscription = None;
        }
        self.shared.waker.wake();
    }

    fn on_complete(&self) {
        {
            let mut q = self.shared.queue.lock();
            q.done = true;
            q.subscription = None;
        }
        self.shared.waker.wake();
    }

    fn name(&self) -> &'static str {
        "stream"
    }
}

/// Publisher viewed as a `Stream` of `Result<T, FlowError>`.
///
/// An error item is always the last one.
pub struct SignalStream<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + 'static> SignalStream<T> {
    /// Subscribes a new stream to `publisher`.
    pub fn subscribe(publisher: &Publisher<T>) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                items: VecDeque::new(),
                subscription: None,
                outstanding: false,
                done: false,
            }),
            waker: AtomicWaker::new(),
        });
        publisher.subscribe(Arc::new(Tap {
            shared: Arc::clone(&shared),
        }));
        Self { shared }
    }
}

impl<T> SignalStream<T> {
    fn ready_item(&self) -> Option<Option<Result<T, FlowError>>> {
        let mut q = self.shared.queue.lock();
        if let Some(item) = q.items.pop_front() {
            return Some(Some(item));
        }
        q.done.then_some(None)
    }
}

impl<T> Stream for SignalStream<T> {
    type Item = Result<T, FlowError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.shared.waker.register(cx.waker());
        if let Some(item) = self.ready_item() {
            return Poll::Ready(item);
        }

        let subscription = {
            let mut q = self.shared.queue.lock();
            match (&q.subscription, q.outstanding) {
                (Some(sub), false) => {
                    let sub = sub.clone();
                    q.outstanding = true;
                    Some(sub)
                }
                _ => None,
            }
        };
        if let Some(sub) = subscription {
            if let Err(error) = sub.request(1) {
                self.shared.queue.lock().outstanding = false;
                return Poll::Ready(Some(Err(error)));
            }
            if let Some(item) = self.ready_item() {
                return Poll::Ready(item);
            }
        }
        Poll::Pending
    }
}

impl<T> Drop for SignalStream<T> {
    fn drop(&mut self) {
        let subscription = self.shared.queue.lock().subscription.take();
        if let Some(sub) = subscription {
            sub.cancel();
        }
    }
}

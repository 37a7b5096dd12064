//! Recording subscriber shared by unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::FlowError;
use crate::subscribers::{Subscriber, Subscription};

/// What a [`Recorder`] observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Seen<T> {
    Value(T),
    Error(&'static str),
    Complete,
}

type Hook<T> = Box<dyn Fn(&Subscription, &T) + Send + Sync>;

pub(crate) struct Recorder<T> {
    name: &'static str,
    initial: Option<i64>,
    hook: Option<Hook<T>>,
    seen: Mutex<Vec<Seen<T>>>,
    errors: Mutex<Vec<FlowError>>,
    subscription: Mutex<Option<Subscription>>,
    subscribed: Mutex<u32>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    fn build(name: &'static str, initial: Option<i64>, hook: Option<Hook<T>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            initial,
            hook,
            seen: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
            subscribed: Mutex::new(0),
        })
    }

    /// Records everything, requests nothing on subscribe.
    pub(crate) fn arc() -> Arc<Self> {
        Self::build("recorder", None, None)
    }

    pub(crate) fn named(name: &'static str) -> Arc<Self> {
        Self::build(name, None, None)
    }

    /// Requests `n` from inside `on_subscribe`.
    pub(crate) fn requesting(n: i64) -> Arc<Self> {
        Self::build("recorder", Some(n), None)
    }

    /// Runs `hook` after recording each value.
    pub(crate) fn with_hook<F>(initial: Option<i64>, hook: F) -> Arc<Self>
    where
        F: Fn(&Subscription, &T) + Send + Sync + 'static,
    {
        Self::build("recorder", initial, Some(Box::new(hook)))
    }

    pub(crate) fn subscription(&self) -> Subscription {
        self.subscription
            .lock()
            .clone()
            .expect("on_subscribe was not called")
    }

    pub(crate) fn request(&self, n: i64) -> Result<(), FlowError> {
        self.subscription().request(n)
    }

    pub(crate) fn cancel(&self) {
        self.subscription().cancel();
    }

    pub(crate) fn seen(&self) -> Vec<Seen<T>> {
        self.seen.lock().clone()
    }

    pub(crate) fn values(&self) -> Vec<T> {
        self.seen
            .lock()
            .iter()
            .filter_map(|s| match s {
                Seen::Value(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn errors(&self) -> Vec<FlowError> {
        self.errors.lock().clone()
    }

    pub(crate) fn completed(&self) -> bool {
        self.seen.lock().iter().any(|s| matches!(s, Seen::Complete))
    }

    /// Number of terminal signals observed (must never exceed one).
    pub(crate) fn terminals(&self) -> usize {
        self.seen
            .lock()
            .iter()
            .filter(|s| !matches!(s, Seen::Value(_)))
            .count()
    }

    pub(crate) fn subscribed(&self) -> u32 {
        *self.subscribed.lock()
    }
}

impl<T: Clone + Send + 'static> Subscriber<T> for Recorder<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        *self.subscribed.lock() += 1;
        *self.subscription.lock() = Some(subscription.clone());
        if let Some(n) = self.initial {
            let _ = subscription.request(n);
        }
    }

    fn on_value(&self, value: T) {
        self.seen.lock().push(Seen::Value(value.clone()));
        if let Some(hook) = &self.hook {
            let sub = self.subscription();
            hook(&sub, &value);
        }
    }

    fn on_error(&self, error: FlowError) {
        self.seen.lock().push(Seen::Error(error.as_label()));
        self.errors.lock().push(error);
    }

    fn on_complete(&self) {
        self.seen.lock().push(Seen::Complete);
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

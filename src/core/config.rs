//! # Publisher configuration.
//!
//! Provides [`PublisherConfig`], the tagged configuration a publisher is built
//! from, and its two variants [`PullConfig`] and [`PushConfig`].
//!
//! ## Capacity convention
//! One rule, applied to both variants:
//! - `capacity = Some(0)` → **direct** strategy (one subscriber, no shared buffer)
//! - `capacity = Some(n)`, `n > 0` → **shared** strategy with a bounded entry buffer
//! - `capacity = None` → **shared** strategy with an unbounded entry buffer
//!
//! ## Defaults
//! - `capacity = Some(DEFAULT_CAPACITY)` (256)
//! - `lag = LagPolicy::Error`
//! - `backpressure = BackpressurePolicy::Pause`
//! - `lazy = true`

use std::fmt;
use std::sync::Arc;

use crate::policies::{BackpressurePolicy, LagPolicy};
use crate::producers::{iter_puller, Emitter, PullFactory, Puller, PushProducer};
use crate::signal::Signal;
use crate::strategies::StrategyKind;

/// Default shared buffer bound.
pub const DEFAULT_CAPACITY: usize = 256;

/// Configuration of a pull publisher.
///
/// ## Field semantics
/// - `capacity`: see the module-level capacity convention
/// - `lag`: applied by shared instances when a new entry does not fit
/// - `factory`: called once per shared instance, or once per direct subscriber
pub struct PullConfig<T> {
    pub capacity: Option<usize>,
    pub lag: LagPolicy,
    pub factory: PullFactory<T>,
}

impl<T: 'static> PullConfig<T> {
    /// Creates a configuration from a puller factory.
    pub fn new<F, P>(factory: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: FnMut(u64) -> Vec<Signal<T>> + Send + 'static,
    {
        Self {
            capacity: Some(DEFAULT_CAPACITY),
            lag: LagPolicy::default(),
            factory: Arc::new(move || Box::new(factory()) as Puller<T>),
        }
    }

    /// Creates a configuration whose pullers walk a fresh iterator from `make`.
    ///
    /// # Example
    /// ```
    /// use backflow::{PullConfig, PublisherConfig, StrategyKind};
    ///
    /// let cfg: PublisherConfig<u32> = PullConfig::iterate(|| 1..=3).direct().into();
    /// assert_eq!(cfg.kind(), StrategyKind::DirectPull);
    /// ```
    pub fn iterate<F, I>(make: F) -> Self
    where
        T: Send,
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::new(move || iter_puller(make()))
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Selects the direct strategy (`capacity = 0`).
    pub fn direct(self) -> Self {
        self.with_capacity(0)
    }

    pub fn unbounded(mut self) -> Self {
        self.capacity = None;
        self
    }

    pub fn with_lag(mut self, lag: LagPolicy) -> Self {
        self.lag = lag;
        self
    }
}

impl<T> Clone for PullConfig<T> {
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            lag: self.lag,
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T> fmt::Debug for PullConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PullConfig")
            .field("capacity", &self.capacity)
            .field("lag", &self.lag)
            .finish_non_exhaustive()
    }
}

/// Configuration of a push publisher.
///
/// ## Field semantics
/// - `lazy`: `true` starts the producer on the first `request`, `false` on `subscribe`
/// - `capacity`: see the module-level capacity convention
/// - `backpressure`: applied when a value finds no demand (direct) or no room (shared)
/// - `producer`: started once per shared instance, or once per direct subscriber
pub struct PushConfig<T> {
    pub lazy: bool,
    pub capacity: Option<usize>,
    pub backpressure: BackpressurePolicy,
    pub producer: PushProducer<T>,
}

impl<T: 'static> PushConfig<T> {
    /// Creates a lazy configuration around `producer`.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn(Emitter<T>) + Send + Sync + 'static,
    {
        Self {
            lazy: true,
            capacity: Some(DEFAULT_CAPACITY),
            backpressure: BackpressurePolicy::default(),
            producer: Arc::new(producer),
        }
    }

    /// Starts production at `subscribe` instead of the first `request`.
    pub fn eager(mut self) -> Self {
        self.lazy = false;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Selects the direct strategy (`capacity = 0`).
    pub fn direct(self) -> Self {
        self.with_capacity(0)
    }

    pub fn unbounded(mut self) -> Self {
        self.capacity = None;
        self
    }

    pub fn with_backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.backpressure = policy;
        self
    }
}

impl<T> Clone for PushConfig<T> {
    fn clone(&self) -> Self {
        Self {
            lazy: self.lazy,
            capacity: self.capacity,
            backpressure: self.backpressure,
            producer: Arc::clone(&self.producer),
        }
    }
}

impl<T> fmt::Debug for PushConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushConfig")
            .field("lazy", &self.lazy)
            .field("capacity", &self.capacity)
            .field("backpressure", &self.backpressure)
            .finish_non_exhaustive()
    }
}

/// Pull or push configuration of a publisher.
pub enum PublisherConfig<T> {
    Pull(PullConfig<T>),
    Push(PushConfig<T>),
}

impl<T> PublisherConfig<T> {
    /// Returns the configured capacity (`None` = unbounded shared buffer).
    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        match self {
            PublisherConfig::Pull(c) => c.capacity,
            PublisherConfig::Push(c) => c.capacity,
        }
    }

    /// Returns `true` when the configuration selects a direct strategy.
    #[inline]
    pub fn is_direct(&self) -> bool {
        self.capacity() == Some(0)
    }

    /// Returns the strategy this configuration selects.
    pub fn kind(&self) -> StrategyKind {
        match (self, self.is_direct()) {
            (PublisherConfig::Pull(_), true) => StrategyKind::DirectPull,
            (PublisherConfig::Pull(_), false) => StrategyKind::SharedPull,
            (PublisherConfig::Push(_), true) => StrategyKind::DirectPush,
            (PublisherConfig::Push(_), false) => StrategyKind::SharedPush,
        }
    }
}

impl<T> From<PullConfig<T>> for PublisherConfig<T> {
    fn from(config: PullConfig<T>) -> Self {
        PublisherConfig::Pull(config)
    }
}

impl<T> From<PushConfig<T>> for PublisherConfig<T> {
    fn from(config: PushConfig<T>) -> Self {
        PublisherConfig::Push(config)
    }
}

impl<T> Clone for PublisherConfig<T> {
    fn clone(&self) -> Self {
        match self {
            PublisherConfig::Pull(c) => PublisherConfig::Pull(c.clone()),
            PublisherConfig::Push(c) => PublisherConfig::Push(c.clone()),
        }
    }
}

impl<T> fmt::Debug for PublisherConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublisherConfig::Pull(c) => f.debug_tuple("Pull").field(c).finish(),
            PublisherConfig::Push(c) => f.debug_tuple("Push").field(c).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pull() -> PullConfig<u8> {
        PullConfig::iterate(Vec::new)
    }

    fn push() -> PushConfig<u8> {
        PushConfig::new(|_emitter| {})
    }

    #[test]
    fn test_defaults() {
        let p = pull();
        assert_eq!(p.capacity, Some(DEFAULT_CAPACITY));
        assert_eq!(p.lag, LagPolicy::Error);

        let q = push();
        assert!(q.lazy);
        assert_eq!(q.capacity, Some(DEFAULT_CAPACITY));
        assert_eq!(q.backpressure, BackpressurePolicy::Pause);
    }

    #[test]
    fn test_capacity_convention() {
        let cases: Vec<(PublisherConfig<u8>, StrategyKind)> = vec![
            (pull().direct().into(), StrategyKind::DirectPull),
            (pull().with_capacity(1).into(), StrategyKind::SharedPull),
            (pull().unbounded().into(), StrategyKind::SharedPull),
            (push().direct().into(), StrategyKind::DirectPush),
            (push().with_capacity(3).into(), StrategyKind::SharedPush),
            (push().unbounded().into(), StrategyKind::SharedPush),
        ];
        for (cfg, want) in cases {
            assert_eq!(cfg.kind(), want, "config {cfg:?}");
        }
    }

    #[test]
    fn test_clone_shares_factory() {
        let cfg = PullConfig::iterate(|| vec![7u8]);
        let copy = cfg.clone();
        assert!(Arc::ptr_eq(&cfg.factory, &copy.factory));
        let mut puller = (copy.factory)();
        assert!(matches!(puller(1).as_slice(), [Signal::Value(7), Signal::Complete]));
    }
}

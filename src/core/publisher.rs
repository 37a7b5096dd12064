//! # Publisher facade.
//!
//! [`Publisher`] binds a [`PublisherConfig`] to the strategy it selects:
//! - **shared** configurations get one strategy instance, built up front and
//!   shared by every subscriber;
//! - **direct** configurations get a fresh strategy instance per `subscribe`,
//!   so a direct publisher can be subscribed repeatedly (each subscriber runs
//!   its own producer).
//!
//! ```text
//! Publisher::subscribe(s)
//!   ├─ shared ─► Arc<strategy>.subscribe(s)            (same instance every time)
//!   └─ direct ─► select(config.clone()).subscribe(s)   (new instance, new producer)
//! ```

use std::fmt;
use std::sync::Arc;

use crate::events::Telemetry;
use crate::strategies::{select, PublisherStrategy, StrategyKind};
use crate::subscribers::Subscriber;

use super::builder::PublisherBuilder;
use super::config::PublisherConfig;

/// Backpressure-aware publisher of `T` values.
///
/// Cloning is cheap: clones of a shared publisher feed the same instance.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use backflow::{Publisher, PullConfig, Subscriber, Subscription};
///
/// struct Print;
///
/// impl Subscriber<u32> for Print {
///     fn on_subscribe(&self, s: Subscription) { let _ = s.request(10); }
///     fn on_value(&self, v: u32) { println!("{v}"); }
///     fn on_error(&self, e: backflow::FlowError) { eprintln!("{e}"); }
///     fn on_complete(&self) { println!("done"); }
/// }
///
/// let publisher = Publisher::new(PullConfig::iterate(|| 1..=3).direct());
/// publisher.subscribe(Arc::new(Print));
/// ```
pub struct Publisher<T> {
    config: PublisherConfig<T>,
    telemetry: Telemetry,
    shared: Option<Arc<dyn PublisherStrategy<T>>>,
}

impl<T: Clone + Send + 'static> Publisher<T> {
    /// Creates an anonymous publisher without an event bus.
    pub fn new(config: impl Into<PublisherConfig<T>>) -> Self {
        PublisherBuilder::new(config).build()
    }

    /// Starts a builder for a named publisher, optionally wired to a bus.
    pub fn builder(config: impl Into<PublisherConfig<T>>) -> PublisherBuilder<T> {
        PublisherBuilder::new(config)
    }

    pub(crate) fn from_parts(config: PublisherConfig<T>, telemetry: Telemetry) -> Self {
        let shared = (!config.is_direct()).then(|| select(config.clone(), telemetry.clone()));
        Self {
            config,
            telemetry,
            shared,
        }
    }

    /// Attaches `subscriber`; it receives its subscription through `on_subscribe`.
    ///
    /// A subscriber arriving after a shared publisher terminated gets a
    /// cancelled subscription followed by the stored terminal signal.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let strategy = match &self.shared {
            Some(strategy) => Arc::clone(strategy),
            None => select(self.config.clone(), self.telemetry.clone()),
        };
        tracing::trace!(
            publisher = self.telemetry.name(),
            strategy = strategy.kind().as_label(),
            subscriber = subscriber.name(),
            "subscribe"
        );
        strategy.subscribe(subscriber);
    }
}

impl<T> Publisher<T> {
    /// Returns the strategy backing this publisher.
    pub fn kind(&self) -> StrategyKind {
        self.config.kind()
    }

    pub fn name(&self) -> &str {
        self.telemetry.name()
    }

    pub fn config(&self) -> &PublisherConfig<T> {
        &self.config
    }
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            telemetry: self.telemetry.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("name", &self.telemetry.name())
            .field("kind", &self.kind())
            .field("config", &self.config)
            .finish()
    }
}

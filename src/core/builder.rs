use std::sync::Arc;

use crate::events::{Bus, Telemetry};

use super::config::PublisherConfig;
use super::publisher::Publisher;

/// Name given to publishers built without [`PublisherBuilder::name`].
const ANONYMOUS: &str = "publisher";

/// Builder for constructing a [`Publisher`] with optional features.
pub struct PublisherBuilder<T> {
    config: PublisherConfig<T>,
    name: Arc<str>,
    bus: Option<Bus>,
}

impl<T> PublisherBuilder<T> {
    /// Creates a new builder with the given configuration.
    pub fn new(config: impl Into<PublisherConfig<T>>) -> Self {
        Self {
            config: config.into(),
            name: Arc::from(ANONYMOUS),
            bus: None,
        }
    }

    /// Sets the publisher name carried by every event it emits.
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Publishes membership, policy and terminal events to `bus`.
    ///
    /// Attach an [`ObserverSet`](crate::ObserverSet) to the same bus to consume them.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }
}

impl<T: Clone + Send + 'static> PublisherBuilder<T> {
    /// Builds the publisher.
    ///
    /// Shared configurations instantiate their strategy here; direct ones do so
    /// on every `subscribe`.
    pub fn build(self) -> Publisher<T> {
        let telemetry = Telemetry::new(self.name, self.bus);
        Publisher::from_parts(self.config, telemetry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PushConfig;
    use crate::strategies::StrategyKind;

    #[test]
    fn test_defaults() {
        let publisher: Publisher<u8> = PublisherBuilder::new(PushConfig::new(|_| {})).build();
        assert_eq!(publisher.name(), ANONYMOUS);
        assert_eq!(publisher.kind(), StrategyKind::SharedPush);
    }

    #[test]
    fn test_name_is_applied() {
        let publisher: Publisher<u8> = PublisherBuilder::new(PushConfig::new(|_| {}).direct())
            .name("clicks")
            .build();
        assert_eq!(publisher.name(), "clicks");
        assert!(publisher.config().is_direct());
    }
}

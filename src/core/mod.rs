//! Engine core: configuration, the publisher facade and per-instance state.
//!
//! Public API from this module is [`Publisher`], [`PublisherBuilder`] and the
//! configuration types. Internal modules:
//! - [`config`]: [`PublisherConfig`] and its pull/push variants;
//! - [`publisher`]: facade that binds a configuration to its strategy;
//! - [`builder`]: optional name and event bus;
//! - [`registry`]: attached subscribers, demand counters and handles;
//! - [`exclusive`]: the single re-entrant lock guarding an instance.

mod builder;
mod config;
mod exclusive;
mod publisher;
mod registry;

pub use builder::PublisherBuilder;
pub use config::{PublisherConfig, PullConfig, PushConfig, DEFAULT_CAPACITY};
pub use publisher::Publisher;

pub(crate) use exclusive::Exclusive;
pub(crate) use registry::{Member, Registry, SubscriberId};

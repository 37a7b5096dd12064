//! # Publisher strategies.
//!
//! A strategy is the execution engine behind a publisher. Four exist, chosen by
//! [`select`] from the configuration's pull/push tag and capacity:
//!
//! ```text
//!                 capacity == 0           capacity > 0 | unbounded
//!              ┌──────────────────┬──────────────────────────────┐
//!   Pull       │ DirectPull       │ SharedPull  (+ LagPolicy)    │
//!   Push       │ DirectPush       │ SharedPush  (+ Backpressure) │
//!              └──────────────────┴──────────────────────────────┘
//! ```
//!
//! ## Rules
//! - All state of an instance lives behind one [`Exclusive`](crate::core::Exclusive).
//! - Subscriber and producer callbacks never run inside a state borrow. A
//!   strategy computes one [`Delivery`], releases the borrow, runs it, and
//!   re-checks membership before the next one.
//! - Every policy decision is published as an [`Event`](crate::Event).

mod direct_pull;
mod direct_push;
mod shared;

use std::sync::Arc;

use crate::core::{PublisherConfig, SubscriberId};
use crate::error::FlowError;
use crate::events::{EventKind, Telemetry};
use crate::signal::Terminal;
use crate::subscribers::{Subscriber, Subscription};

pub(crate) use direct_pull::DirectPull;
pub(crate) use direct_push::DirectPush;
pub(crate) use shared::{SharedPull, SharedPush};

/// Which of the four strategies backs a publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    DirectPull,
    DirectPush,
    SharedPull,
    SharedPush,
}

impl StrategyKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StrategyKind::DirectPull => "direct_pull",
            StrategyKind::DirectPush => "direct_push",
            StrategyKind::SharedPull => "shared_pull",
            StrategyKind::SharedPush => "shared_push",
        }
    }

    /// Returns `true` for the single-subscriber strategies.
    pub fn is_direct(&self) -> bool {
        matches!(self, StrategyKind::DirectPull | StrategyKind::DirectPush)
    }
}

/// Execution engine behind a publisher.
pub(crate) trait PublisherStrategy<T>: Send + Sync {
    /// Attaches `subscriber` and hands it its subscription.
    fn subscribe(self: Arc<Self>, subscriber: Arc<dyn Subscriber<T>>);

    fn kind(&self) -> StrategyKind;
}

/// Instantiates the strategy a configuration selects.
pub(crate) fn select<T>(
    config: PublisherConfig<T>,
    telemetry: Telemetry,
) -> Arc<dyn PublisherStrategy<T>>
where
    T: Clone + Send + 'static,
{
    match config {
        PublisherConfig::Pull(c) if c.capacity == Some(0) => DirectPull::new(c, telemetry),
        PublisherConfig::Pull(c) => SharedPull::new(c, telemetry),
        PublisherConfig::Push(c) if c.capacity == Some(0) => DirectPush::new(c, telemetry),
        PublisherConfig::Push(c) => SharedPush::new(c, telemetry),
    }
}

/// One callback owed to one subscriber.
pub(crate) enum Delivery<T> {
    Value(Arc<dyn Subscriber<T>>, T),
    Error(Arc<dyn Subscriber<T>>, FlowError),
    Complete(Arc<dyn Subscriber<T>>),
}

impl<T: 'static> Delivery<T> {
    pub(crate) fn terminal(subscriber: Arc<dyn Subscriber<T>>, terminal: Terminal) -> Self {
        match terminal {
            Terminal::Complete => Delivery::Complete(subscriber),
            Terminal::Error(e) => Delivery::Error(subscriber, e),
        }
    }

    pub(crate) fn run(self) {
        match self {
            Delivery::Value(s, v) => s.on_value(v),
            Delivery::Error(s, e) => s.on_error(e),
            Delivery::Complete(s) => s.on_complete(),
        }
    }
}

/// Publishes the event of an accepted terminal signal.
fn terminated(telemetry: &Telemetry, terminal: &Terminal) {
    let ev = match terminal {
        Terminal::Complete => telemetry.event(EventKind::Completed),
        Terminal::Error(e) => telemetry.event(EventKind::Failed).with_reason(e.as_message()),
    };
    telemetry.publish(ev);
}

/// Turns away a subscriber that cannot attach.
///
/// The subscriber still gets a (cancelled) subscription, then the error.
fn reject<T: 'static>(telemetry: &Telemetry, subscriber: Arc<dyn Subscriber<T>>, error: FlowError) {
    tracing::debug!(publisher = telemetry.name(), subscriber = subscriber.name(), "subscriber rejected");
    telemetry.publish(
        telemetry
            .event(EventKind::Rejected)
            .with_reason(error.as_label())
            .with_subscriber(subscriber.name(), SubscriberId::DETACHED.get()),
    );
    subscriber.on_subscribe(Subscription::detached());
    subscriber.on_error(error);
}

/// Hands a stored terminal to a subscriber arriving after termination.
fn replay_terminal<T: 'static>(subscriber: Arc<dyn Subscriber<T>>, terminal: Terminal) {
    subscriber.on_subscribe(Subscription::detached());
    Delivery::terminal(subscriber, terminal).run();
}

fn membership(telemetry: &Telemetry, kind: EventKind, name: &'static str, id: SubscriberId) {
    telemetry.publish(telemetry.event(kind).with_subscriber(name, id.get()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PullConfig, PushConfig};

    fn telemetry() -> Telemetry {
        Telemetry::new("select".into(), None)
    }

    #[test]
    fn test_select_follows_capacity_rule() {
        let configs: Vec<PublisherConfig<u8>> = vec![
            PullConfig::iterate(Vec::new).direct().into(),
            PullConfig::iterate(Vec::new).into(),
            PushConfig::new(|_| {}).direct().into(),
            PushConfig::new(|_| {}).unbounded().into(),
        ];
        for cfg in configs {
            let want = cfg.kind();
            let got = select(cfg, telemetry()).kind();
            assert_eq!(got, want);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(StrategyKind::SharedPush.as_label(), "shared_push");
        assert!(StrategyKind::DirectPull.is_direct());
        assert!(!StrategyKind::SharedPull.is_direct());
    }
}

//! # Direct pull strategy.
//!
//! One subscriber, one puller obtained lazily from the factory on its first
//! request.
//!
//! ```text
//! request(n) ─► demand += n ─► pull(demand) ─► [v1 v2 … Complete x y]
//!                                               │  │      │        └─ discarded
//!                                               ▼  ▼      ▼
//!                                          on_value ×≤demand   on_complete, member removed
//! ```
//!
//! ## Rules
//! - A batch longer than the outstanding demand has its excess dropped
//!   (`ValueDropped`); a shorter batch leaves the rest of the demand banked.
//! - A second `subscribe` while a subscriber is attached is rejected with
//!   [`FlowError::Occupied`]. Once the first subscriber cancels or terminates the
//!   instance accepts a new one, with a fresh puller.

use std::sync::Arc;

use crate::core::{Exclusive, PullConfig, Registry, SubscriberId};
use crate::error::FlowError;
use crate::events::{EventKind, Telemetry};
use crate::producers::{PullFactory, Puller};
use crate::signal::{Signal, Terminal};
use crate::subscribers::{Demand, Subscriber, Subscription};

use super::{membership, reject, terminated, Delivery, PublisherStrategy, StrategyKind};

/// The lone member's puller; `None` until the first request.
type Slot<T> = Option<Puller<T>>;

pub(crate) struct DirectPull<T> {
    factory: PullFactory<T>,
    telemetry: Telemetry,
    state: Exclusive<Registry<T, Slot<T>>>,
}

impl<T: Send + 'static> DirectPull<T> {
    pub(crate) fn new(config: PullConfig<T>, telemetry: Telemetry) -> Arc<Self> {
        Arc::new(Self {
            factory: config.factory,
            telemetry,
            state: Exclusive::new(Registry::new()),
        })
    }

    /// Lends the puller out of the state together with the outstanding demand.
    fn lend(&self, id: SubscriberId) -> Option<(u64, Puller<T>)> {
        let lent = self.state.with(|reg| {
            let member = reg.get_mut(id)?;
            if member.demand == 0 {
                return None;
            }
            Some((member.demand, member.ext.take()))
        })?;
        let (demand, puller) = lent;
        Some((demand, puller.unwrap_or_else(|| (self.factory)())))
    }

    /// Walks one batch in order, re-checking membership before every callback.
    fn deliver(&self, id: SubscriberId, batch: Vec<Signal<T>>) {
        let mut dropped = 0usize;
        for signal in batch {
            match signal {
                Signal::Value(v) => {
                    let next = self.state.with(|reg| {
                        let member = reg.get_mut(id)?;
                        if member.demand == 0 {
                            return Some(None);
                        }
                        member.demand -= 1;
                        Some(Some(Arc::clone(&member.subscriber)))
                    });
                    match next {
                        Some(Some(sub)) => Delivery::Value(sub, v).run(),
                        Some(None) => dropped += 1,
                        None => return,
                    }
                }
                other => {
                    let Some(terminal) = Terminal::from_signal(other) else {
                        continue;
                    };
                    let Some(member) = self.state.with(|reg| reg.remove(id)) else {
                        return;
                    };
                    terminated(&self.telemetry, &terminal);
                    Delivery::terminal(member.subscriber, terminal).run();
                    break;
                }
            }
        }
        if dropped > 0 {
            tracing::debug!(publisher = self.telemetry.name(), dropped, "pull batch exceeded demand");
            self.telemetry.publish(
                self.telemetry
                    .event(EventKind::ValueDropped)
                    .with_reason(format!("{dropped} value(s) beyond demand")),
            );
        }
    }
}

impl<T: Send + 'static> PublisherStrategy<T> for DirectPull<T> {
    fn subscribe(self: Arc<Self>, subscriber: Arc<dyn Subscriber<T>>) {
        let _pass = self.state.enter();
        let id = self.state.with(|reg| {
            reg.is_empty()
                .then(|| reg.register(Arc::clone(&subscriber), None))
        });
        let Some(id) = id else {
            reject(&self.telemetry, subscriber, FlowError::Occupied);
            return;
        };
        membership(&self.telemetry, EventKind::Subscribed, subscriber.name(), id);
        let target: Arc<dyn Demand> = self.clone();
        subscriber.on_subscribe(Subscription::new(id, target));
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectPull
    }
}

impl<T: Send + 'static> Demand for DirectPull<T> {
    fn request(&self, id: SubscriberId, n: u64) -> Result<(), FlowError> {
        let _pass = self.state.enter();
        if !self.state.with(|reg| reg.credit(id, n)) {
            return Ok(());
        }
        let Some((demand, mut puller)) = self.lend(id) else {
            return Ok(());
        };
        let batch = puller(demand);
        self.state.with(|reg| {
            if let Some(member) = reg.get_mut(id) {
                member.ext = Some(puller);
            }
        });
        self.deliver(id, batch);
        Ok(())
    }

    fn cancel(&self, id: SubscriberId) {
        let _pass = self.state.enter();
        if let Some(member) = self.state.with(|reg| reg.remove(id)) {
            membership(&self.telemetry, EventKind::Cancelled, member.subscriber.name(), id);
        }
    }

    fn violate(&self, id: SubscriberId, requested: i64) {
        let _pass = self.state.enter();
        let Some(member) = self.state.with(|reg| reg.remove(id)) else {
            return;
        };
        self.telemetry.publish(
            self.telemetry
                .event(EventKind::ProtocolViolation)
                .with_subscriber(member.subscriber.name(), id.get())
                .with_requested(requested),
        );
        member
            .subscriber
            .on_error(FlowError::ProtocolViolation { requested });
    }
}

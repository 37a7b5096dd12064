//! # Shared pull strategy.
//!
//! Many subscribers draw from one puller, each at its own pace.
//!
//! ```text
//! request(id, n)
//!   1. demand(id) += n
//!   2. settle: serve backlogs (every member with demand, lowest handle first)
//!   3. id caught up and still hungry? ─► pull(demand(id)) once
//!        for each signal:
//!          Value     ─► room? append : apply LagPolicy, then append; settle
//!          terminal  ─► store, rest of batch discarded; settle
//! ```
//!
//! ## Rules
//! - The puller is created on the first pull and never called concurrently with
//!   itself; a request issued from inside a delivery of that pull only banks
//!   demand.
//! - `LagPolicy::Throw` discards the value that did not fit and the rest of the
//!   batch, and fails the `request` that pulled it.
//! - A subscriber arriving after the terminal receives the terminal at once.

use std::sync::Arc;

use crate::core::{Exclusive, PullConfig, SubscriberId};
use crate::error::FlowError;
use crate::events::{EventKind, Telemetry};
use crate::policies::LagPolicy;
use crate::producers::{PullFactory, Puller};
use crate::signal::{Signal, Terminal};
use crate::strategies::{
    membership, replay_terminal, terminated, PublisherStrategy, StrategyKind,
};
use crate::subscribers::{Demand, Subscriber, Subscription};

use super::Fanout;

enum PullerSlot<T> {
    Unborn,
    Idle(Puller<T>),
    Lent,
}

struct State<T> {
    fanout: Fanout<T>,
    puller: PullerSlot<T>,
}

pub(crate) struct SharedPull<T> {
    lag: LagPolicy,
    factory: PullFactory<T>,
    telemetry: Telemetry,
    state: Exclusive<State<T>>,
}

impl<T: Clone + Send + 'static> SharedPull<T> {
    pub(crate) fn new(config: PullConfig<T>, telemetry: Telemetry) -> Arc<Self> {
        Arc::new(Self {
            lag: config.lag,
            factory: config.factory,
            telemetry,
            state: Exclusive::new(State {
                fanout: Fanout::new(config.capacity),
                puller: PullerSlot::Unborn,
            }),
        })
    }

    fn settle(&self) {
        while let Some(delivery) = self.state.with(|s| s.fanout.step_any()) {
            delivery.run();
        }
    }

    /// Takes the puller out of the state, creating it on first use.
    fn lend(&self) -> Option<Puller<T>> {
        let slot = self
            .state
            .with(|s| std::mem::replace(&mut s.puller, PullerSlot::Lent));
        match slot {
            PullerSlot::Unborn => Some((self.factory)()),
            PullerSlot::Idle(puller) => Some(puller),
            PullerSlot::Lent => None,
        }
    }

    fn accept(&self, batch: Vec<Signal<T>>) -> Result<(), FlowError> {
        for signal in batch {
            let value = match signal {
                Signal::Value(v) => v,
                other => {
                    if let Some(terminal) = Terminal::from_signal(other) {
                        if self.state.with(|s| s.fanout.terminate(terminal.clone())) {
                            terminated(&self.telemetry, &terminal);
                        }
                    }
                    break;
                }
            };
            if self.state.with(|s| s.fanout.overflowing()) {
                self.overflow()?;
            }
            self.state.with(|s| s.fanout.append(value));
            self.settle();
        }
        Ok(())
    }

    /// Makes room for one entry according to the lag policy.
    fn overflow(&self) -> Result<(), FlowError> {
        let capacity = self.state.with(|s| s.fanout.capacity());
        tracing::debug!(
            publisher = self.telemetry.name(),
            capacity,
            policy = self.lag.as_label(),
            "shared buffer full"
        );
        match self.lag {
            LagPolicy::Drop => {
                let skipped = self.state.with(|s| s.fanout.evict_oldest(None));
                self.telemetry.publish(
                    self.telemetry
                        .event(EventKind::LagDropped)
                        .with_capacity(capacity)
                        .with_reason(format!("{} subscriber(s) skipped an entry", skipped.len())),
                );
                Ok(())
            }
            LagPolicy::Error => {
                let error = FlowError::LagExceeded { capacity };
                let doomed = self.state.with(|s| s.fanout.evict_oldest(Some(&error)));
                for (id, name) in doomed {
                    self.telemetry.publish(
                        self.telemetry
                            .event(EventKind::LagErrored)
                            .with_subscriber(name, id.get())
                            .with_capacity(capacity),
                    );
                }
                Ok(())
            }
            LagPolicy::Throw => {
                self.telemetry.publish(
                    self.telemetry
                        .event(EventKind::BackpressureExceeded)
                        .with_capacity(capacity)
                        .with_reason(self.lag.as_label()),
                );
                Err(FlowError::LagExceeded { capacity })
            }
        }
    }
}

impl<T: Clone + Send + 'static> PublisherStrategy<T> for SharedPull<T> {
    fn subscribe(self: Arc<Self>, subscriber: Arc<dyn Subscriber<T>>) {
        let _pass = self.state.enter();
        let terminal = self.state.with(|s| s.fanout.terminal().cloned());
        if let Some(terminal) = terminal {
            replay_terminal(subscriber, terminal);
            return;
        }
        let id = self.state.with(|s| s.fanout.join(Arc::clone(&subscriber)));
        membership(&self.telemetry, EventKind::Subscribed, subscriber.name(), id);
        let target: Arc<dyn Demand> = self.clone();
        subscriber.on_subscribe(Subscription::new(id, target));
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::SharedPull
    }
}

impl<T: Clone + Send + 'static> Demand for SharedPull<T> {
    fn request(&self, id: SubscriberId, n: u64) -> Result<(), FlowError> {
        let _pass = self.state.enter();
        if !self.state.with(|s| s.fanout.credit(id, n)) {
            return Ok(());
        }
        self.settle();

        let Some(wanted) = self.state.with(|s| s.fanout.shortfall(id)) else {
            return Ok(());
        };
        let Some(mut puller) = self.lend() else {
            return Ok(());
        };
        let batch = puller(wanted);
        self.state.with(|s| s.puller = PullerSlot::Idle(puller));
        self.accept(batch)?;
        self.settle();
        Ok(())
    }

    fn cancel(&self, id: SubscriberId) {
        let _pass = self.state.enter();
        if let Some(member) = self.state.with(|s| s.fanout.leave(id)) {
            membership(&self.telemetry, EventKind::Cancelled, member.subscriber.name(), id);
        }
    }

    fn violate(&self, id: SubscriberId, requested: i64) {
        let _pass = self.state.enter();
        let Some(member) = self.state.with(|s| s.fanout.leave(id)) else {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Recorder, Seen};

    fn strategy(values: Vec<u32>, capacity: usize, lag: LagPolicy) -> Arc<SharedPull<u32>> {
        let cfg = PullConfig::iterate(move || values.clone())
            .with_capacity(capacity)
            .with_lag(lag);
        SharedPull::new(cfg, Telemetry::new("shared-pull".into(), None))
    }

    fn counter(capacity: usize, lag: LagPolicy) -> Arc<SharedPull<u32>> {
        let cfg = PullConfig::new(|| {
            let mut next = 0u32;
            move |n: u64| {
                (0..n)
                    .map(|_| {
                        next += 1;
                        Signal::Value(next)
                    })
                    .collect()
            }
        })
        .with_capacity(capacity)
        .with_lag(lag);
        SharedPull::new(cfg, Telemetry::new("counter".into(), None))
    }

    #[test]
    fn test_all_subscribers_see_value_in_subscription_order() {
        let pull = counter(8, LagPolicy::Error);
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let recs: Vec<_> = (0..3)
            .map(|i| {
                let order = Arc::clone(&order);
                let rec = Recorder::with_hook(None, move |_sub: &Subscription, v: &u32| {
                    order.lock().push((i, *v));
                });
                Arc::clone(&pull).subscribe(rec.clone());
                rec
            })
            .collect();

        for rec in &recs {
            rec.request(1).unwrap();
        }

        for rec in &recs {
            assert_eq!(rec.values(), vec![1], "exactly once each");
        }
        assert_eq!(*order.lock(), vec![(0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_backlog_served_before_new_pull() {
        let pull = counter(8, LagPolicy::Error);
        let a = Recorder::<u32>::arc();
        let b = Recorder::<u32>::arc();
        Arc::clone(&pull).subscribe(a.clone());
        Arc::clone(&pull).subscribe(b.clone());

        a.request(3).unwrap();
        b.request(4).unwrap();

        assert_eq!(a.values(), vec![1, 2, 3]);
        assert_eq!(b.values(), vec![1, 2, 3, 4], "backlog, then one pull for the shortfall");
        assert_eq!(a.seen().len(), 3);
    }

    #[test]
    fn test_terminal_after_backlog() {
        let pull = strategy(vec![1, 2, 3], 8, LagPolicy::Error);
        let fast = Recorder::<u32>::arc();
        let slow = Recorder::<u32>::arc();
        Arc::clone(&pull).subscribe(fast.clone());
        Arc::clone(&pull).subscribe(slow.clone());

        fast.request(10).unwrap();
        assert_eq!(fast.seen(), vec![Seen::Value(1), Seen::Value(2), Seen::Value(3), Seen::Complete]);
        assert!(slow.seen().is_empty(), "terminal must wait behind the backlog");

        slow.request(1).unwrap();
        assert_eq!(slow.seen(), vec![Seen::Value(1)]);
        slow.request(5).unwrap();
        assert_eq!(
            slow.seen(),
            vec![Seen::Value(1), Seen::Value(2), Seen::Value(3), Seen::Complete]
        );
    }

    #[test]
    fn test_lag_error_hits_only_lagging_subscriber() {
        let pull = counter(2, LagPolicy::Error);
        let fast = Recorder::<u32>::arc();
        let slow = Recorder::<u32>::arc();
        Arc::clone(&pull).subscribe(fast.clone());
        Arc::clone(&pull).subscribe(slow.clone());

        fast.request(1).unwrap();
        fast.request(1).unwrap();
        assert!(slow.seen().is_empty());
        fast.request(1).unwrap();

        assert_eq!(slow.seen(), vec![Seen::Error("lag_exceeded")]);
        assert!(matches!(slow.errors()[0], FlowError::LagExceeded { capacity: 2 }));

        fast.request(2).unwrap();
        assert_eq!(fast.values(), vec![1, 2, 3, 4, 5], "fast subscriber unaffected");
        slow.request(1).unwrap();
        assert_eq!(slow.terminals(), 1);
    }

    #[test]
    fn test_lag_drop_skips_oldest() {
        let pull = counter(2, LagPolicy::Drop);
        let fast = Recorder::<u32>::arc();
        let slow = Recorder::<u32>::arc();
        Arc::clone(&pull).subscribe(fast.clone());
        Arc::clone(&pull).subscribe(slow.clone());

        fast.request(3).unwrap();
        slow.request(10).unwrap();

        assert_eq!(slow.values()[..2], [2, 3], "value 1 was evicted for the slow subscriber");
        assert!(slow.errors().is_empty());
    }

    #[test]
    fn test_lag_throw_fails_request() {
        let pull = counter(2, LagPolicy::Throw);
        let fast = Recorder::<u32>::arc();
        let slow = Recorder::<u32>::arc();
        Arc::clone(&pull).subscribe(fast.clone());
        Arc::clone(&pull).subscribe(slow.clone());

        fast.request(2).unwrap();
        let err = fast.request(1).unwrap_err();

        assert!(matches!(err, FlowError::LagExceeded { capacity: 2 }));
        assert_eq!(fast.values(), vec![1, 2]);
        slow.request(2).unwrap();
        assert_eq!(slow.values(), vec![1, 2], "buffer untouched by the throw");
    }

    #[test]
    fn test_cancel_silences_and_releases_entries() {
        let pull = counter(2, LagPolicy::Error);
        let a = Recorder::<u32>::arc();
        let b = Recorder::<u32>::arc();
        Arc::clone(&pull).subscribe(a.clone());
        Arc::clone(&pull).subscribe(b.clone());

        a.request(2).unwrap();
        b.cancel();
        a.request(5).unwrap();

        assert!(b.seen().is_empty());
        assert_eq!(a.values(), vec![1, 2, 3, 4, 5, 6, 7]);
        assert!(a.errors().is_empty(), "no lag once the laggard left");
    }

    #[test]
    fn test_non_positive_request() {
        for bad in [0, -5] {
            let pull = counter(4, LagPolicy::Error);
            let a = Recorder::<u32>::arc();
            let b = Recorder::<u32>::arc();
            Arc::clone(&pull).subscribe(a.clone());
            Arc::clone(&pull).subscribe(b.clone());

            b.request(bad).unwrap();
            a.request(2).unwrap();
            b.request(2).unwrap();

            assert_eq!(b.seen(), vec![Seen::Error("protocol_violation")], "request({bad})");
            assert_eq!(a.values(), vec![1, 2]);
        }
    }

    #[test]
    fn test_late_subscriber_gets_stored_terminal() {
        let pull = strategy(vec![], 4, LagPolicy::Error);
        let first = Recorder::<u32>::requesting(1);
        Arc::clone(&pull).subscribe(first.clone());
        assert_eq!(first.seen(), vec![Seen::Complete]);

        let late = Recorder::<u32>::arc();
        pull.subscribe(late.clone());
        assert_eq!(late.seen(), vec![Seen::Complete]);
        assert_eq!(late.subscribed(), 1);
    }
}

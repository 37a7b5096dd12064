//! # Shared push strategy.
//!
//! One producer feeds every subscriber through the shared entry buffer. The
//! producer starts on the first `subscribe` (eager) or the first `request` from
//! any subscriber (lazy).
//!
//! ```text
//! emit(Value v, fb)
//!   ├─ terminal stored ─► ignored, fb.stop()
//!   ├─ room            ─► append (pending for current members), settle
//!   └─ buffer full     ─► Drop  : v discarded for everyone
//!                         Pause : park v, fb.pause() ── room again ─► append v, fb.resume()
//!                         Stop  : fb.stop(), store Complete
//!                         Error : fb.stop(), store BackpressureExceeded
//!                         Throw : as Error, and emit → Err
//! emit(Error | Complete) ─► store terminal; each member gets it after its backlog
//! ```
//!
//! The buffer only fills up when members lag: an entry no member is pending on
//! is retired at once.

use std::sync::{Arc, Weak};

use crate::core::{Exclusive, PushConfig, SubscriberId};
use crate::error::FlowError;
use crate::events::{EventKind, Telemetry};
use crate::policies::BackpressurePolicy;
use crate::producers::{Emitter, Feedback, PushProducer, PushSink};
use crate::signal::{Signal, Terminal};
use crate::strategies::{
    membership, replay_terminal, terminated, PublisherStrategy, StrategyKind,
};
use crate::subscribers::{Demand, Subscriber, Subscription};

use super::Fanout;

struct State<T> {
    fanout: Fanout<T>,
    started: bool,
    /// Value held back while the producer is paused.
    parked: Option<(T, Arc<dyn Feedback>)>,
}

pub(crate) struct SharedPush<T> {
    me: Weak<Self>,
    lazy: bool,
    policy: BackpressurePolicy,
    producer: PushProducer<T>,
    telemetry: Telemetry,
    state: Exclusive<State<T>>,
}

impl<T: Clone + Send + 'static> SharedPush<T> {
    pub(crate) fn new(config: PushConfig<T>, telemetry: Telemetry) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: Weak::clone(me),
            lazy: config.lazy,
            policy: config.backpressure,
            producer: config.producer,
            telemetry,
            state: Exclusive::new(State {
                fanout: Fanout::new(config.capacity),
                started: false,
                parked: None,
            }),
        })
    }

    fn start(&self) {
        let first = self
            .state
            .with(|s| !std::mem::replace(&mut s.started, true));
        if !first {
            return;
        }
        let sink: Weak<dyn PushSink<T>> = self.me.clone();
        tracing::debug!(publisher = self.telemetry.name(), "starting shared producer");
        (self.producer)(Emitter::new(sink, SubscriberId::DETACHED));
    }

    fn settle(&self) {
        while let Some(delivery) = self.state.with(|s| s.fanout.step_any()) {
            delivery.run();
        }
    }

    /// Re-admits the parked value once the buffer has room again.
    fn release(&self) {
        let resumed = self.state.with(|s| {
            if s.fanout.overflowing() || s.fanout.terminal().is_some() {
                return None;
            }
            let (value, feedback) = s.parked.take()?;
            s.fanout.append(value);
            Some(feedback)
        });
        if let Some(feedback) = resumed {
            self.settle();
            self.telemetry
                .publish(self.telemetry.event(EventKind::ProducerResumed));
            feedback.resume();
        }
    }

    fn terminate(&self, terminal: Terminal) {
        let fresh = self.state.with(|s| {
            s.parked = None;
            s.fanout.terminate(terminal.clone())
        });
        if fresh {
            terminated(&self.telemetry, &terminal);
        }
        self.settle();
    }

    fn overflow(&self, value: T, feedback: Arc<dyn Feedback>) -> Result<(), FlowError> {
        let capacity = self.state.with(|s| s.fanout.capacity());
        tracing::debug!(
            publisher = self.telemetry.name(),
            capacity,
            policy = self.policy.as_label(),
            "shared buffer full"
        );
        match self.policy {
            BackpressurePolicy::Drop => {
                self.telemetry.publish(
                    self.telemetry
                        .event(EventKind::ValueDropped)
                        .with_capacity(capacity)
                        .with_reason("buffer full"),
                );
                Ok(())
            }
            BackpressurePolicy::Pause => {
                let parked = self.state.with(|s| {
                    if s.parked.is_some() {
                        return false;
                    }
                    s.parked = Some((value, Arc::clone(&feedback)));
                    true
                });
                if parked {
                    self.telemetry
                        .publish(self.telemetry.event(EventKind::ProducerPaused));
                    feedback.pause();
                } else {
                    self.telemetry.publish(
                        self.telemetry
                            .event(EventKind::ValueDropped)
                            .with_capacity(capacity)
                            .with_reason("producer ignored pause"),
                    );
                }
                Ok(())
            }
            BackpressurePolicy::Stop => {
                self.telemetry
                    .publish(self.telemetry.event(EventKind::ProducerStopped));
                feedback.stop();
                self.terminate(Terminal::Complete);
                Ok(())
            }
            BackpressurePolicy::Error | BackpressurePolicy::Throw => {
                let error = FlowError::BackpressureExceeded { capacity };
                self.telemetry
                    .publish(self.telemetry.event(EventKind::ProducerStopped));
                feedback.stop();
                self.telemetry.publish(
                    self.telemetry
                        .event(EventKind::BackpressureExceeded)
                        .with_capacity(capacity)
                        .with_reason(self.policy.as_label()),
                );
                self.terminate(Terminal::Error(error.clone()));
                match self.policy {
                    BackpressurePolicy::Throw => Err(error),
                    _ => Ok(()),
                }
            }
        }
    }

    fn leave(&self, id: SubscriberId) -> Option<Arc<dyn Subscriber<T>>> {
        let member = self.state.with(|s| s.fanout.leave(id))?;
        Some(member.subscriber)
    }
}

impl<T: Clone + Send + 'static> PublisherStrategy<T> for SharedPush<T> {
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
        if !self.lazy {
            self.start();
        }
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::SharedPush
    }
}

impl<T: Clone + Send + 'static> PushSink<T> for SharedPush<T> {
    fn accept(
        &self,
        _ticket: SubscriberId,
        signal: Signal<T>,
        feedback: Arc<dyn Feedback>,
    ) -> Result<(), FlowError> {
        let _pass = self.state.enter();
        if self.state.with(|s| s.fanout.terminal().is_some()) {
            feedback.stop();
            return Ok(());
        }
        match signal {
            Signal::Value(v) => {
                if self.state.with(|s| s.fanout.overflowing()) {
                    return self.overflow(v, feedback);
                }
                self.state.with(|s| s.fanout.append(v));
                self.settle();
                Ok(())
            }
            other => {
                if let Some(terminal) = Terminal::from_signal(other) {
                    self.terminate(terminal);
                }
                Ok(())
            }
        }
    }

    fn is_open(&self, _ticket: SubscriberId) -> bool {
        self.state.with(|s| s.fanout.terminal().is_none())
    }
}

impl<T: Clone + Send + 'static> Demand for SharedPush<T> {
    fn request(&self, id: SubscriberId, n: u64) -> Result<(), FlowError> {
        let _pass = self.state.enter();
        if !self.state.with(|s| s.fanout.credit(id, n)) {
            return Ok(());
        }
        self.settle();
        self.release();
        if self.lazy {
            self.start();
        }
        Ok(())
    }

    fn cancel(&self, id: SubscriberId) {
        let _pass = self.state.enter();
        if let Some(subscriber) = self.leave(id) {
            membership(&self.telemetry, EventKind::Cancelled, subscriber.name(), id);
            self.release();
        }
    }

    fn violate(&self, id: SubscriberId, requested: i64) {
        let _pass = self.state.enter();
        let Some(subscriber) = self.leave(id) else {
            return;
        };
        self.telemetry.publish(
            self.telemetry
                .event(EventKind::ProtocolViolation)
                .with_subscriber(subscriber.name(), id.get())
                .with_requested(requested),
        );
        subscriber.on_error(FlowError::ProtocolViolation { requested });
        self.release();
    }
}

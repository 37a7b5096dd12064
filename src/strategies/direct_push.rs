//! # Direct push strategy.
//!
//! One subscriber, one producer started for that subscriber: at `subscribe`
//! (eager) or at its first `request` (lazy). Each emission is matched against
//! the subscriber's demand; a value that finds none is handled by the
//! [`BackpressurePolicy`].
//!
//! ```text
//! emit(Value v, fb)
//!   ├─ demand > 0 ─► on_value(v)
//!   └─ demand = 0 ─► Drop  : discard
//!                    Pause : park v, fb.pause()   ── request(n) ─► on_value(v), fb.resume()
//!                    Stop  : fb.stop(), on_complete
//!                    Error : fb.stop(), on_error(BackpressureExceeded)
//!                    Throw : fb.stop(), on_error(BackpressureExceeded), emit → Err
//! emit(Error | Complete) ─► terminal, regardless of demand
//! ```
//!
//! ## Rules
//! - Only one value is parked while paused; further values that ignore the pause
//!   are dropped (`ValueDropped`).
//! - `cancel()` calls `stop()` on the last feedback the producer supplied.
//! - Emitters carry the subscriber handle: an emitter from an ended session is
//!   closed even if the instance has since accepted a new subscriber.

use std::sync::{Arc, Weak};

use crate::core::{Exclusive, PushConfig, Registry, SubscriberId};
use crate::error::FlowError;
use crate::events::{EventKind, Telemetry};
use crate::policies::BackpressurePolicy;
use crate::producers::{Emitter, Feedback, PushProducer, PushSink};
use crate::signal::{Signal, Terminal};
use crate::subscribers::{Demand, Subscriber, Subscription};

use super::{membership, reject, terminated, Delivery, PublisherStrategy, StrategyKind};

/// Producer session attached to the lone member.
struct Session<T> {
    started: bool,
    /// Last feedback seen, stopped on cancel.
    feedback: Option<Arc<dyn Feedback>>,
    /// Feedback paused by the publisher.
    paused: Option<Arc<dyn Feedback>>,
    parked: Option<T>,
}

impl<T> Session<T> {
    fn new() -> Self {
        Self {
            started: false,
            feedback: None,
            paused: None,
            parked: None,
        }
    }
}

/// What to do with one emitted value.
enum Admit<T> {
    Deliver(Arc<dyn Subscriber<T>>, T),
    Overflow(T),
    Closed,
}

pub(crate) struct DirectPush<T> {
    me: Weak<Self>,
    lazy: bool,
    policy: BackpressurePolicy,
    producer: PushProducer<T>,
    telemetry: Telemetry,
    state: Exclusive<Registry<T, Session<T>>>,
}

impl<T: Send + 'static> DirectPush<T> {
    pub(crate) fn new(config: PushConfig<T>, telemetry: Telemetry) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: Weak::clone(me),
            lazy: config.lazy,
            policy: config.backpressure,
            producer: config.producer,
            telemetry,
            state: Exclusive::new(Registry::new()),
        })
    }

    /// Starts the producer for `id` unless it already runs.
    fn start(&self, id: SubscriberId) {
        let first = self.state.with(|reg| match reg.get_mut(id) {
            Some(member) if !member.ext.started => {
                member.ext.started = true;
                true
            }
            _ => false,
        });
        if !first {
            return;
        }
        let sink: Weak<dyn PushSink<T>> = self.me.clone();
        tracing::debug!(publisher = self.telemetry.name(), subscriber = id.get(), "starting producer");
        (self.producer)(Emitter::new(sink, id));
    }

    fn stop(&self, feedback: &Arc<dyn Feedback>) {
        self.telemetry
            .publish(self.telemetry.event(EventKind::ProducerStopped));
        feedback.stop();
    }

    fn accept_value(
        &self,
        id: SubscriberId,
        value: T,
        feedback: Arc<dyn Feedback>,
    ) -> Result<(), FlowError> {
        let admit = self.state.with(|reg| {
            let Some(member) = reg.get_mut(id) else {
                return Admit::Closed;
            };
            member.ext.feedback = Some(Arc::clone(&feedback));
            if member.demand > 0 {
                member.demand -= 1;
                Admit::Deliver(Arc::clone(&member.subscriber), value)
            } else {
                Admit::Overflow(value)
            }
        });

        let value = match admit {
            Admit::Deliver(sub, v) => {
                Delivery::Value(sub, v).run();
                return Ok(());
            }
            Admit::Closed => {
                feedback.stop();
                return Ok(());
            }
            Admit::Overflow(v) => v,
        };

        tracing::debug!(
            publisher = self.telemetry.name(),
            policy = self.policy.as_label(),
            "value without demand"
        );
        match self.policy {
            BackpressurePolicy::Drop => {
                self.dropped(id, "no demand");
                Ok(())
            }
            BackpressurePolicy::Pause => {
                let parked = self.state.with(|reg| match reg.get_mut(id) {
                    Some(member) if member.ext.parked.is_none() => {
                        member.ext.parked = Some(value);
                        member.ext.paused = Some(Arc::clone(&feedback));
                        true
                    }
                    _ => false,
                });
                if parked {
                    self.telemetry
                        .publish(self.telemetry.event(EventKind::ProducerPaused));
                    feedback.pause();
                } else {
                    self.dropped(id, "producer ignored pause");
                }
                Ok(())
            }
            BackpressurePolicy::Stop => {
                self.stop(&feedback);
                self.finish(id, Terminal::Complete);
                Ok(())
            }
            BackpressurePolicy::Error | BackpressurePolicy::Throw => {
                let error = FlowError::BackpressureExceeded { capacity: 0 };
                self.stop(&feedback);
                self.telemetry.publish(
                    self.telemetry
                        .event(EventKind::BackpressureExceeded)
                        .with_capacity(0)
                        .with_reason(self.policy.as_label()),
                );
                self.finish(id, Terminal::Error(error.clone()));
                match self.policy {
                    BackpressurePolicy::Throw => Err(error),
                    _ => Ok(()),
                }
            }
        }
    }

    fn dropped(&self, id: SubscriberId, reason: &'static str) {
        let name = self.state.with(|reg| reg.name_of(id)).unwrap_or("gone");
        self.telemetry.publish(
            self.telemetry
                .event(EventKind::ValueDropped)
                .with_subscriber(name, id.get())
                .with_reason(reason),
        );
    }

    /// Removes the member and delivers `terminal` to it.
    fn finish(&self, id: SubscriberId, terminal: Terminal) {
        let Some(member) = self.state.with(|reg| reg.remove(id)) else {
            return;
        };
        terminated(&self.telemetry, &terminal);
        Delivery::terminal(member.subscriber, terminal).run();
    }
}

impl<T: Send + 'static> PublisherStrategy<T> for DirectPush<T> {
    fn subscribe(self: Arc<Self>, subscriber: Arc<dyn Subscriber<T>>) {
        let _pass = self.state.enter();
        let id = self.state.with(|reg| {
            reg.is_empty()
                .then(|| reg.register(Arc::clone(&subscriber), Session::new()))
        });
        let Some(id) = id else {
            reject(&self.telemetry, subscriber, FlowError::Occupied);
            return;
        };
        membership(&self.telemetry, EventKind::Subscribed, subscriber.name(), id);
        let target: Arc<dyn Demand> = self.clone();
        subscriber.on_subscribe(Subscription::new(id, target));
        if !self.lazy {
            self.start(id);
        }
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectPush
    }
}

impl<T: Send + 'static> PushSink<T> for DirectPush<T> {
    fn accept(
        &self,
        ticket: SubscriberId,
        signal: Signal<T>,
        feedback: Arc<dyn Feedback>,
    ) -> Result<(), FlowError> {
        let _pass = self.state.enter();
        match signal {
            Signal::Value(v) => self.accept_value(ticket, v, feedback),
            other => {
                if let Some(terminal) = Terminal::from_signal(other) {
                    if self.state.with(|reg| reg.contains(ticket)) {
                        self.finish(ticket, terminal);
                    } else {
                        feedback.stop();
                    }
                }
                Ok(())
            }
        }
    }

    fn is_open(&self, ticket: SubscriberId) -> bool {
        self.state.with(|reg| reg.contains(ticket))
    }
}

impl<T: Send + 'static> Demand for DirectPush<T> {
    fn request(&self, id: SubscriberId, n: u64) -> Result<(), FlowError> {
        let _pass = self.state.enter();
        let parked = self.state.with(|reg| {
            if !reg.credit(id, n) {
                return None;
            }
            let member = reg.get_mut(id)?;
            let parked = member.ext.parked.take()?;
            member.demand -= 1;
            Some((Arc::clone(&member.subscriber), parked))
        });
        if let Some((sub, v)) = parked {
            Delivery::Value(sub, v).run();
        }

        let resume = self.state.with(|reg| {
            let member = reg.get_mut(id)?;
            if member.demand > 0 && member.ext.parked.is_none() {
                member.ext.paused.take()
            } else {
                None
            }
        });
        if let Some(feedback) = resume {
            self.telemetry
                .publish(self.telemetry.event(EventKind::ProducerResumed));
            feedback.resume();
        }

        if self.lazy {
            self.start(id);
        }
        Ok(())
    }

    fn cancel(&self, id: SubscriberId) {
        let _pass = self.state.enter();
        let Some(member) = self.state.with(|reg| reg.remove(id)) else {
            return;
        };
        membership(&self.telemetry, EventKind::Cancelled, member.subscriber.name(), id);
        if let Some(feedback) = member.ext.feedback.or(member.ext.paused) {
            self.stop(&feedback);
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
        if let Some(feedback) = member.ext.feedback.or(member.ext.paused) {
            self.stop(&feedback);
        }
        member
            .subscriber
            .on_error(FlowError::ProtocolViolation { requested });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producers::{Valve, ValveState};
    use crate::test_support::{Recorder, Seen};
    use parking_lot::Mutex;

    /// Producer that stashes its emitter so the test drives emissions by hand.
    fn manual(
        policy: BackpressurePolicy,
    ) -> (Arc<DirectPush<u32>>, Arc<Mutex<Option<Emitter<u32>>>>) {
        let slot: Arc<Mutex<Option<Emitter<u32>>>> = Arc::new(Mutex::new(None));
        let stash = Arc::clone(&slot);
        let cfg = PushConfig::new(move |emitter| {
            *stash.lock() = Some(emitter);
        })
        .direct()
        .with_backpressure(policy);
        (
            DirectPush::new(cfg, Telemetry::new("direct-push".into(), None)),
            slot,
        )
    }

    fn emitter(slot: &Mutex<Option<Emitter<u32>>>) -> Emitter<u32> {
        slot.lock().clone().expect("producer was not started")
    }

    #[test]
    fn test_lazy_start_on_first_request() {
        let (push, slot) = manual(BackpressurePolicy::Drop);
        let rec = Recorder::<u32>::arc();
        push.subscribe(rec.clone());
        assert!(slot.lock().is_none(), "lazy producer must wait for demand");

        rec.request(2).unwrap();
        let em = emitter(&slot);
        for v in 1..=3 {
            em.emit(Signal::Value(v), Valve::new()).unwrap();
        }

        assert_eq!(rec.values(), vec![1, 2], "third value exceeds demand");
    }

    #[test]
    fn test_eager_start_at_subscribe() {
        let started = Arc::new(Mutex::new(0u32));
        let count = Arc::clone(&started);
        let cfg = PushConfig::new(move |_emitter: Emitter<u32>| *count.lock() += 1)
            .direct()
            .eager();
        let push = DirectPush::new(cfg, Telemetry::new("eager".into(), None));
        let rec = Recorder::<u32>::arc();
        Arc::clone(&push).subscribe(rec.clone());
        rec.request(1).unwrap();

        assert_eq!(*started.lock(), 1, "started once, at subscribe");
    }

    #[test]
    fn test_pause_parks_value_and_resumes() {
        let (push, slot) = manual(BackpressurePolicy::Pause);
        let rec = Recorder::<u32>::arc();
        push.subscribe(rec.clone());
        rec.request(1).unwrap();

        let em = emitter(&slot);
        let valve = Valve::new();
        em.emit(Signal::Value(1), valve.clone()).unwrap();
        em.emit(Signal::Value(2), valve.clone()).unwrap();
        assert_eq!(valve.state(), ValveState::Paused);
        em.emit(Signal::Value(3), valve.clone()).unwrap();

        rec.request(2).unwrap();
        assert_eq!(rec.values(), vec![1, 2], "parked value delivered first");
        assert_eq!(valve.state(), ValveState::Open);

        em.emit(Signal::Value(4), valve.clone()).unwrap();
        assert_eq!(rec.values(), vec![1, 2, 4], "value 3 ignored the pause");
    }

    #[test]
    fn test_stop_completes_subscriber() {
        let (push, slot) = manual(BackpressurePolicy::Stop);
        let rec = Recorder::<u32>::arc();
        push.subscribe(rec.clone());
        rec.request(1).unwrap();

        let em = emitter(&slot);
        let valve = Valve::new();
        em.emit(Signal::Value(1), valve.clone()).unwrap();
        em.emit(Signal::Value(2), valve.clone()).unwrap();

        assert_eq!(rec.seen(), vec![Seen::Value(1), Seen::Complete]);
        assert!(valve.is_stopped());
        assert!(em.is_closed());
    }

    #[test]
    fn test_error_policy_fails_subscriber() {
        let (push, slot) = manual(BackpressurePolicy::Error);
        let rec = Recorder::<u32>::arc();
        push.subscribe(rec.clone());
        rec.request(1).unwrap();

        let em = emitter(&slot);
        let valve = Valve::new();
        em.emit(Signal::Value(1), valve.clone()).unwrap();
        assert!(em.emit(Signal::Value(2), valve.clone()).is_ok());

        assert_eq!(rec.seen(), vec![Seen::Value(1), Seen::Error("backpressure_exceeded")]);
        assert!(valve.is_stopped());
    }

    #[test]
    fn test_throw_policy_fails_emit() {
        let (push, slot) = manual(BackpressurePolicy::Throw);
        let rec = Recorder::<u32>::arc();
        push.subscribe(rec.clone());
        rec.request(1).unwrap();

        let em = emitter(&slot);
        let valve = Valve::new();
        em.emit(Signal::Value(1), valve.clone()).unwrap();
        let err = em.emit(Signal::Value(2), valve.clone()).unwrap_err();

        assert!(matches!(err, FlowError::BackpressureExceeded { capacity: 0 }));
        assert!(valve.is_stopped(), "stop() precedes the thrown error");
        assert_eq!(rec.terminals(), 1);
    }

    #[test]
    fn test_producer_terminal_ignores_demand() {
        let (push, slot) = manual(BackpressurePolicy::Drop);
        let rec = Recorder::<u32>::arc();
        push.subscribe(rec.clone());
        rec.request(5).unwrap();

        let em = emitter(&slot);
        em.emit(Signal::Value(1), Valve::new()).unwrap();
        em.emit(Signal::Complete, Valve::new()).unwrap();
        em.emit(Signal::Value(2), Valve::new()).unwrap();

        assert_eq!(rec.seen(), vec![Seen::Value(1), Seen::Complete]);
    }

    #[test]
    fn test_cancel_stops_producer_and_silences() {
        let (push, slot) = manual(BackpressurePolicy::Drop);
        let rec = Recorder::<u32>::arc();
        push.subscribe(rec.clone());
        rec.request(5).unwrap();

        let em = emitter(&slot);
        let valve = Valve::new();
        em.emit(Signal::Value(1), valve.clone()).unwrap();
        rec.cancel();
        em.emit(Signal::Value(2), valve.clone()).unwrap();
        em.emit(Signal::Complete, valve.clone()).unwrap();

        assert_eq!(rec.seen(), vec![Seen::Value(1)]);
        assert!(valve.is_stopped());
    }

    #[test]
    fn test_synchronous_producer_respects_demand() {
        let cfg = PushConfig::new(|emitter: Emitter<u32>| {
            let valve = Valve::new();
            for v in 1..=10 {
                if !valve.is_open() {
                    break;
                }
                let _ = emitter.emit(Signal::Value(v), valve.clone());
            }
        })
        .direct()
        .with_backpressure(BackpressurePolicy::Pause);
        let push = DirectPush::new(cfg, Telemetry::new("sync".into(), None));
        let rec = Recorder::<u32>::requesting(3);
        push.subscribe(rec.clone());

        assert_eq!(rec.values(), vec![1, 2, 3]);
        rec.request(1).unwrap();
        assert_eq!(rec.values(), vec![1, 2, 3, 4], "parked value 4 released");
    }
}

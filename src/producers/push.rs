//! # Push producers and producer feedback.
//!
//! A [`PushProducer`] is invoked exactly once with an [`Emitter`]. Every emission
//! carries a [`Feedback`] object the publisher uses to apply its backpressure
//! policy to that producer.
//!
//! ```text
//! producer ──emit(Value, fb)──► strategy ──demand/room?──► yes: deliver / buffer
//!                                           └─────────────► no:  policy
//!                                                                  Drop   → discard
//!                                                                  Pause  → fb.pause() … fb.resume()
//!                                                                  Stop   → fb.stop(), complete
//!                                                                  Error  → fb.stop(), fail subscribers
//!                                                                  Throw  → fb.stop(), emit() returns Err
//! ```
//!
//! ## Rules
//! - `emit` may be called from any thread, including from inside a subscriber
//!   callback or from inside the producer's start call.
//! - An emitter whose publisher is gone, or whose direct session has ended, is
//!   closed: `emit` returns `Ok(())`, ignores the signal and calls `stop()`.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};

use crate::core::SubscriberId;
use crate::error::FlowError;
use crate::signal::Signal;

/// Hooks the publisher calls back on the producer.
pub trait Feedback: Send + Sync {
    /// Stop emitting until [`resume`](Feedback::resume) is called.
    fn pause(&self);
    /// Emitting is welcome again.
    fn resume(&self);
    /// Stop emitting for good.
    fn stop(&self);
}

/// Strategy side of an emitter.
pub(crate) trait PushSink<T>: Send + Sync {
    fn accept(
        &self,
        ticket: SubscriberId,
        signal: Signal<T>,
        feedback: Arc<dyn Feedback>,
    ) -> Result<(), FlowError>;

    fn is_open(&self, ticket: SubscriberId) -> bool;
}

/// Push producer: started once with the emitter it should feed.
pub type PushProducer<T> = Arc<dyn Fn(Emitter<T>) + Send + Sync>;

/// Handle a push producer uses to hand signals to its publisher.
pub struct Emitter<T> {
    sink: Weak<dyn PushSink<T>>,
    ticket: SubscriberId,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            sink: Weak::clone(&self.sink),
            ticket: self.ticket,
        }
    }
}

impl<T> Emitter<T> {
    pub(crate) fn new(sink: Weak<dyn PushSink<T>>, ticket: SubscriberId) -> Self {
        Self { sink, ticket }
    }

    /// Hands one signal to the publisher.
    ///
    /// # Errors
    /// Returns [`FlowError::BackpressureExceeded`] when the publisher runs
    /// [`BackpressurePolicy::Throw`](crate::BackpressurePolicy::Throw) and the
    /// value could not be accepted. `feedback.stop()` has been called by then.
    pub fn emit(&self, signal: Signal<T>, feedback: Arc<dyn Feedback>) -> Result<(), FlowError> {
        match self.sink.upgrade() {
            Some(sink) => sink.accept(self.ticket, signal, feedback),
            None => {
                feedback.stop();
                Ok(())
            }
        }
    }

    /// Returns `true` once the publisher will ignore further signals.
    pub fn is_closed(&self) -> bool {
        self.sink
            .upgrade()
            .map_or(true, |sink| !sink.is_open(self.ticket))
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("ticket", &self.ticket.get())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// State of a [`Valve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    Open,
    Paused,
    /// Terminal: a stopped valve never reopens.
    Stopped,
}

/// Ready-made [`Feedback`] for producers running on their own thread.
///
/// ```rust
/// use std::sync::Arc;
/// use backflow::{Feedback, Valve, ValveState};
///
/// let valve = Valve::new();
/// valve.pause();
/// assert_eq!(valve.state(), ValveState::Paused);
/// valve.resume();
/// assert!(valve.wait_open());
/// valve.stop();
/// valve.resume();
/// assert!(valve.is_stopped());
/// ```
pub struct Valve {
    state: Mutex<ValveState>,
    changed: Condvar,
}

impl Valve {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ValveState::Open),
            changed: Condvar::new(),
        })
    }

    pub fn state(&self) -> ValveState {
        *self.state.lock()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ValveState::Open
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == ValveState::Stopped
    }

    /// Blocks while paused. Returns `false` once stopped.
    ///
    /// Never call this from inside a subscriber callback or from the producer's
    /// start call: the publisher resumes the valve from the thread that requests.
    pub fn wait_open(&self) -> bool {
        let mut state = self.state.lock();
        while *state == ValveState::Paused {
            self.changed.wait(&mut state);
        }
        *state == ValveState::Open
    }

    fn set(&self, from: &[ValveState], to: ValveState) {
        let mut state = self.state.lock();
        if from.contains(&state) {
            *state = to;
            self.changed.notify_all();
        }
    }
}

impl Feedback for Valve {
    fn pause(&self) {
        self.set(&[ValveState::Open], ValveState::Paused);
    }

    fn resume(&self) {
        self.set(&[ValveState::Paused], ValveState::Open);
    }

    fn stop(&self) {
        self.set(&[ValveState::Open, ValveState::Paused], ValveState::Stopped);
    }
}

impl fmt::Debug for Valve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Valve").field("state", &self.state()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    struct Sink {
        seen: Mutex<Vec<Signal<u32>>>,
    }

    impl PushSink<u32> for Sink {
        fn accept(
            &self,
            _ticket: SubscriberId,
            signal: Signal<u32>,
            _feedback: Arc<dyn Feedback>,
        ) -> Result<(), FlowError> {
            self.seen.lock().push(signal);
            Ok(())
        }

        fn is_open(&self, ticket: SubscriberId) -> bool {
            ticket.get() == 1
        }
    }

    #[test]
    fn test_emitter_forwards_to_sink() {
        let sink = Arc::new(Sink {
            seen: Mutex::new(Vec::new()),
        });
        let weak: Weak<dyn PushSink<u32>> = Arc::downgrade(&sink) as Weak<dyn PushSink<u32>>;
        let emitter = Emitter::new(weak, SubscriberId::new(1));

        emitter.emit(Signal::Value(4), Valve::new()).unwrap();
        assert!(!emitter.is_closed());
        assert_eq!(sink.seen.lock().len(), 1);
    }

    #[test]
    fn test_orphaned_emitter_stops_producer() {
        let sink = Arc::new(Sink {
            seen: Mutex::new(Vec::new()),
        });
        let weak: Weak<dyn PushSink<u32>> = Arc::downgrade(&sink) as Weak<dyn PushSink<u32>>;
        let emitter = Emitter::new(weak, SubscriberId::new(1));
        drop(sink);

        let valve = Valve::new();
        assert!(emitter.emit(Signal::Value(1), valve.clone()).is_ok());
        assert!(emitter.is_closed());
        assert!(valve.is_stopped(), "orphaned emission must stop the producer");
    }

    #[test]
    fn test_valve_wait_unblocks_on_resume() {
        let valve = Valve::new();
        valve.pause();

        let waiter = {
            let valve = Arc::clone(&valve);
            thread::spawn(move || valve.wait_open())
        };
        thread::sleep(Duration::from_millis(20));
        valve.resume();

        assert!(waiter.join().unwrap(), "resumed valve must report open");
    }

    #[test]
    fn test_valve_stop_is_sticky() {
        let valve = Valve::new();
        valve.stop();
        valve.resume();
        valve.pause();
        assert_eq!(valve.state(), ValveState::Stopped);
        assert!(!valve.wait_open());
    }
}

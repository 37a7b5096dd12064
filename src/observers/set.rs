//! # Non-blocking event fan-out to multiple observers.
//!
//! Provides [`ObserverSet`]: a bus listener plus one bounded queue and worker
//! task per observer.
//!
//! ## Architecture
//! ```text
//! Bus ──► listener ──┬──► [queue 1] ──► worker 1 ──► observer1.on_event()
//!  (broadcast)       │    (bounded)         └──────► panic → ObserverPanicked
//!                    ├──► [queue 2] ──► worker 2 ──► observer2.on_event()
//!                    └──► [queue N] ──► worker N ──► observerN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-observer ordering**: observer A may process event N while B processes N+5
//! - **Overflow**: event dropped for that observer only, `ObserverOverflow` published
//! - **Listener lag**: the broadcast receiver skipped events, `ObserverOverflow` published
//! - **Isolation**: a slow or panicking observer doesn't affect others
//! - **Shutdown**: events already on the bus are forwarded, then queues close and
//!   workers drain them
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if an observer uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};

use super::Observe;

/// Per-observer channel metadata.
struct ObserverChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Queues of every attached observer.
struct Channels {
    channels: Vec<ObserverChannel>,
    bus: Bus,
}

impl Channels {
    /// Hands one event to every queue without waiting.
    fn emit(&self, event: Arc<Event>) {
        let is_overflow_evt = matches!(event.kind, EventKind::ObserverOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::observer_overflow(channel.name, reason));
            }
        }
    }
}

/// Fan-out coordinator for event observers.
///
/// Requires a Tokio runtime: [`attach`](Self::attach) spawns the listener and
/// the workers.
pub struct ObserverSet {
    listener: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    token: CancellationToken,
}

impl ObserverSet {
    /// Subscribes to `bus` and spawns one worker per observer.
    ///
    /// Events published after this call returns are seen by every observer
    /// (subject to queue overflow).
    #[must_use]
    pub fn attach(bus: &Bus, observers: Vec<Arc<dyn Observe>>) -> Self {
        let mut channels = Vec::with_capacity(observers.len());
        let mut workers = Vec::with_capacity(observers.len());

        for obs in observers {
            let cap = obs.queue_capacity().max(1);
            let name = obs.name();
            let (tx, rx) = mpsc::channel::<Arc<Event>>(cap);
            workers.push(tokio::spawn(Self::worker(obs, rx, bus.clone())));
            channels.push(ObserverChannel { name, sender: tx });
        }

        let token = CancellationToken::new();
        let rx = bus.subscribe();
        let channels = Channels {
            channels,
            bus: bus.clone(),
        };
        let listener = tokio::spawn(Self::listen(rx, channels, token.clone()));
        Self {
            listener,
            workers,
            token,
        }
    }

    async fn worker(obs: Arc<dyn Observe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
        while let Some(ev) = rx.recv().await {
            let fut = obs.on_event(ev.as_ref());

            if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                let info = {
                    let any = &*panic_err;
                    if let Some(msg) = any.downcast_ref::<&'static str>() {
                        (*msg).to_string()
                    } else if let Some(msg) = any.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "unknown panic".to_string()
                    }
                };
                tracing::warn!(observer = obs.name(), %info, "observer panicked");
                bus.publish(Event::observer_panicked(obs.name(), info));
            }
        }
    }

    async fn listen(
        mut rx: broadcast::Receiver<Event>,
        channels: Channels,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        channels.emit(Arc::new(ev));
                    }
                    break;
                }
                msg = rx.recv() => match msg {
                    Ok(ev) => channels.emit(Arc::new(ev)),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "observer listener lagged behind the bus");
                        channels
                            .bus
                            .publish(Event::observer_overflow("listener", "lagged"));
                    }
                }
            }
        }
    }

    /// Stops listening and waits for every worker to drain its queue.
    ///
    /// 1. Cancels the listener, which forwards what is already on the bus
    /// 2. Listener exit drops the queue senders (workers see channel closed)
    /// 3. Awaits all workers
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.listener.await;

        for h in self.workers {
            let _ = h.await;
        }
    }
}

//! # Shared (fan-out) strategies.
//!
//! Both shared strategies keep a [`Fanout`]: the registry, the entry buffer and
//! the stored terminal. They differ only in where values come from.
//!
//! ## Architecture
//! ```text
//!                    front                         next_seq
//!                      ▼                               ▼
//! buffer:            [ e3 ][ e4 ][ e5 ][ e6 ]
//! cursors:     A ──────▲                        (A pending on e3..e6, lagging)
//!              B ────────────────────▲          (B pending on e5..e6)
//!              C ────────────────────────────────▲ (C joined after e6: sees none of them)
//! ```
//!
//! ## Rules
//! - A member is pending on entry `seq` iff `cursor <= seq`; a new member's
//!   cursor is `next_seq`, so late joiners never see older entries.
//! - Entries below the smallest cursor are retired at once; with no members
//!   every entry is retired, so a value accepted with nobody attached is gone.
//! - Eviction under a lag policy moves (Drop) or dooms (Error) exactly the
//!   members still pending on the evicted entry.
//! - A terminal is handed to a member only once it has no backlog left; doomed
//!   members get their lag error before anything else.

mod buffer;
mod pull;
mod push;

use std::sync::Arc;

use crate::core::{Member, Registry, SubscriberId};
use crate::error::FlowError;
use crate::signal::Terminal;
use crate::subscribers::Subscriber;

use super::Delivery;
use buffer::EntryBuffer;

pub(crate) use pull::SharedPull;
pub(crate) use push::SharedPush;

/// Per-member read position.
pub(super) struct Cursor {
    next: u64,
    /// Lag error owed to the member; its cursor no longer holds entries.
    doom: Option<FlowError>,
}

/// Registry, entry buffer and terminal state of one shared instance.
pub(super) struct Fanout<T> {
    registry: Registry<T, Cursor>,
    buffer: EntryBuffer<T>,
    capacity: Option<usize>,
    terminal: Option<Terminal>,
}

impl<T: Clone + 'static> Fanout<T> {
    pub(super) fn new(capacity: Option<usize>) -> Self {
        Self {
            registry: Registry::new(),
            buffer: EntryBuffer::new(),
            capacity,
            terminal: None,
        }
    }

    pub(super) fn terminal(&self) -> Option<&Terminal> {
        self.terminal.as_ref()
    }

    pub(super) fn join(&mut self, subscriber: Arc<dyn Subscriber<T>>) -> SubscriberId {
        let next = self.buffer.next_seq();
        self.registry.register(subscriber, Cursor { next, doom: None })
    }

    /// Removes a member; entries only it was pending on are retired.
    pub(super) fn leave(&mut self, id: SubscriberId) -> Option<Member<T, Cursor>> {
        let member = self.registry.remove(id)?;
        self.retire();
        Some(member)
    }

    pub(super) fn credit(&mut self, id: SubscriberId, n: u64) -> bool {
        self.registry.credit(id, n)
    }

    /// Demand a pull should serve for `id`: only when it has no backlog left.
    pub(super) fn shortfall(&self, id: SubscriberId) -> Option<u64> {
        if self.terminal.is_some() {
            return None;
        }
        let member = self.registry.get(id)?;
        let caught_up = member.ext.next.max(self.buffer.front_seq()) >= self.buffer.next_seq();
        (caught_up && member.demand > 0 && member.ext.doom.is_none()).then_some(member.demand)
    }

    /// `true` when one more entry would exceed the bound.
    pub(super) fn overflowing(&self) -> bool {
        self.capacity.is_some_and(|cap| self.buffer.len() >= cap)
    }

    pub(super) fn capacity(&self) -> usize {
        self.capacity.unwrap_or(usize::MAX)
    }

    /// Buffers `value` as an entry pending for every current member.
    pub(super) fn append(&mut self, value: T) {
        self.buffer.push(value);
        self.retire();
    }

    /// Retires the oldest entry. Members pending on it skip it (`doom = None`) or
    /// are doomed with the given error. Returns the affected members.
    pub(super) fn evict_oldest(
        &mut self,
        doom: Option<&FlowError>,
    ) -> Vec<(SubscriberId, &'static str)> {
        let seq = self.buffer.front_seq();
        if self.buffer.pop_front().is_none() {
            return Vec::new();
        }
        let mut lagging = Vec::new();
        for (id, member) in self.registry.iter_mut() {
            if member.ext.doom.is_some() || member.ext.next > seq {
                continue;
            }
            match doom {
                Some(error) => {
                    member.ext.doom = Some(error.clone());
                    member.ext.next = u64::MAX;
                }
                None => member.ext.next = seq + 1,
            }
            lagging.push((*id, member.subscriber.name()));
        }
        self.retire();
        lagging
    }

    /// Stores the terminal. Returns `false` if one was already stored.
    pub(super) fn terminate(&mut self, terminal: Terminal) -> bool {
        if self.terminal.is_some() {
            return false;
        }
        self.terminal = Some(terminal);
        true
    }

    /// Next callback owed to any member, lowest handle first.
    pub(super) fn step_any(&mut self) -> Option<Delivery<T>> {
        let id = self
            .registry
            .iter()
            .find(|(_, member)| self.ready(member))
            .map(|(id, _)| *id)?;
        self.step_for(id)
    }

    fn ready(&self, member: &Member<T, Cursor>) -> bool {
        if member.ext.doom.is_some() {
            return true;
        }
        let pending = member.ext.next.max(self.buffer.front_seq()) < self.buffer.next_seq();
        if pending {
            member.demand > 0
        } else {
            self.terminal.is_some()
        }
    }

    /// Next callback owed to `id`, with the state already advanced past it.
    pub(super) fn step_for(&mut self, id: SubscriberId) -> Option<Delivery<T>> {
        let front = self.buffer.front_seq();
        let end = self.buffer.next_seq();
        let member = self.registry.get_mut(id)?;

        if let Some(error) = member.ext.doom.take() {
            let member = self.registry.remove(id)?;
            return Some(Delivery::Error(member.subscriber, error));
        }

        member.ext.next = member.ext.next.max(front);
        if member.ext.next < end {
            if member.demand == 0 {
                return None;
            }
            let seq = member.ext.next;
            let value = self.buffer.get(seq)?.clone();
            member.demand -= 1;
            member.ext.next = seq + 1;
            let subscriber = Arc::clone(&member.subscriber);
            if seq == front {
                self.retire();
            }
            return Some(Delivery::Value(subscriber, value));
        }

        let terminal = self.terminal.clone()?;
        let member = self.registry.remove(id)?;
        self.retire();
        Some(Delivery::terminal(member.subscriber, terminal))
    }

    fn retire(&mut self) {
        let front = self.buffer.front_seq();
        let min = self
            .registry
            .iter()
            .map(|(_, member)| member.ext.next.max(front))
            .min()
            .unwrap_or(u64::MAX);
        self.buffer.retire_below(min);
    }

    #[cfg(test)]
    fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Recorder;

    fn values(steps: Vec<Delivery<u32>>) -> Vec<u32> {
        steps
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Value(_, v) => Some(v),
                _ => None,
            })
            .collect()
    }

    fn drain(fan: &mut Fanout<u32>) -> Vec<Delivery<u32>> {
        std::iter::from_fn(|| fan.step_any()).collect()
    }

    #[test]
    fn test_late_joiner_skips_older_entries() {
        let mut fan = Fanout::new(None);
        let a = fan.join(Recorder::<u32>::arc());
        fan.append(1);
        let b = fan.join(Recorder::<u32>::arc());
        fan.append(2);

        fan.credit(a, 10);
        fan.credit(b, 10);
        let got = drain(&mut fan);

        assert_eq!(values(got), vec![1, 2, 2]);
        assert_eq!(fan.buffered(), 0, "consumed entries are retired");
    }

    #[test]
    fn test_no_members_retires_immediately() {
        let mut fan = Fanout::new(Some(2));
        fan.append(1);
        fan.append(2);
        assert_eq!(fan.buffered(), 0);
        assert!(!fan.overflowing());
    }

    #[test]
    fn test_leave_releases_entries() {
        let mut fan = Fanout::new(None);
        let a = fan.join(Recorder::<u32>::arc());
        let b = fan.join(Recorder::<u32>::arc());
        fan.append(1);
        fan.credit(a, 1);
        let _ = drain(&mut fan);
        assert_eq!(fan.buffered(), 1, "b still pending");

        fan.leave(b);
        assert_eq!(fan.buffered(), 0);
    }

    #[test]
    fn test_terminal_waits_for_backlog() {
        let mut fan = Fanout::new(None);
        let a = fan.join(Recorder::<u32>::arc());
        fan.append(1);
        fan.append(2);
        assert!(fan.terminate(Terminal::Complete));
        assert!(!fan.terminate(Terminal::Complete), "first terminal wins");

        assert!(fan.step_any().is_none(), "backlog without demand blocks the terminal");
        fan.credit(a, 2);
        let got = drain(&mut fan);
        assert!(matches!(
            got.as_slice(),
            [Delivery::Value(_, 1), Delivery::Value(_, 2), Delivery::Complete(_)]
        ));
        assert!(fan.step_for(a).is_none(), "member removed after its terminal");
    }

    #[test]
    fn test_evict_dooms_only_pending_members() {
        let mut fan = Fanout::new(Some(2));
        let fast = fan.join(Recorder::<u32>::arc());
        let slow = fan.join(Recorder::<u32>::arc());
        fan.credit(fast, 10);
        fan.append(1);
        fan.append(2);
        let _ = drain(&mut fan);
        assert!(fan.overflowing());

        let lag = FlowError::LagExceeded { capacity: 2 };
        let hit = fan.evict_oldest(Some(&lag));

        assert_eq!(hit.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![slow]);
        assert_eq!(fan.buffered(), 0, "doomed cursors hold no entries");
        assert!(matches!(fan.step_for(slow), Some(Delivery::Error(_, FlowError::LagExceeded { .. }))));
    }

    #[test]
    fn test_evict_drop_moves_cursor() {
        let mut fan = Fanout::new(Some(2));
        let a = fan.join(Recorder::<u32>::arc());
        fan.append(1);
        fan.append(2);
        let hit = fan.evict_oldest(None);
        fan.append(3);

        assert_eq!(hit.len(), 1);
        fan.credit(a, 5);
        assert_eq!(values(drain(&mut fan)), vec![2, 3]);
    }

    #[test]
    fn test_shortfall_only_when_caught_up() {
        let mut fan = Fanout::new(None);
        let a = fan.join(Recorder::<u32>::arc());
        let b = fan.join(Recorder::<u32>::arc());
        fan.credit(a, 3);
        assert_eq!(fan.shortfall(a), Some(3));

        fan.append(1);
        let _ = drain(&mut fan);
        assert_eq!(fan.shortfall(a), Some(2));

        fan.credit(b, 1);
        assert_eq!(fan.shortfall(b), None, "b must drain its backlog first");
        fan.terminate(Terminal::Complete);
        assert_eq!(fan.shortfall(a), None);
    }
}

//! # Entry buffer of the shared strategies.
//!
//! Ordered container of buffered values addressed by a monotonically increasing
//! sequence number. Entry `seq` lives at `entries[seq - front]`.
//!
//! Pending sets are not stored here: a member with cursor `c` is pending on every
//! entry with `seq >= c`. Retiring entries is therefore a prefix pop, driven by
//! the smallest cursor of the registry.

use std::collections::VecDeque;

pub(super) struct EntryBuffer<T> {
    entries: VecDeque<T>,
    front: u64,
}

impl<T> EntryBuffer<T> {
    pub(super) fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            front: 0,
        }
    }

    /// Sequence number of the oldest buffered entry (or of the next one if empty).
    pub(super) fn front_seq(&self) -> u64 {
        self.front
    }

    /// Sequence number the next appended entry receives.
    pub(super) fn next_seq(&self) -> u64 {
        self.front + self.entries.len() as u64
    }

    pub(super) fn get(&self, seq: u64) -> Option<&T> {
        let offset = seq.checked_sub(self.front)?;
        self.entries.get(usize::try_from(offset).ok()?)
    }

    pub(super) fn push(&mut self, value: T) -> u64 {
        let seq = self.next_seq();
        self.entries.push_back(value);
        seq
    }

    pub(super) fn pop_front(&mut self) -> Option<T> {
        let value = self.entries.pop_front()?;
        self.front += 1;
        Some(value)
    }

    /// Retires every entry with `seq < min`. Returns the number retired.
    pub(super) fn retire_below(&mut self, min: u64) -> usize {
        let mut retired = 0;
        while self.front < min && self.pop_front().is_some() {
            retired += 1;
        }
        retired
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }
}

//! # Subscriber registry of one strategy instance.
//!
//! The registry is the sole authority for "is this subscriber still eligible to
//! receive signals". Strategies consult it before every delivery.
//!
//! ## Rules
//! - Handles ([`SubscriberId`]) are assigned in subscription order and never reused
//!   within an instance, so iteration order is first-subscribed-first.
//! - Removing a member is an O(log n) map edit; shared strategies derive entry
//!   pending sets from member cursors, so no buffered entry needs to be touched.
//! - Demand saturates at `u64::MAX`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::subscribers::Subscriber;

/// Handle of a subscriber within one strategy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct SubscriberId(u64);

impl SubscriberId {
    /// Handle carried by subscriptions that were never registered.
    pub(crate) const DETACHED: SubscriberId = SubscriberId(0);

    pub(crate) fn get(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn new(raw: u64) -> Self {
        SubscriberId(raw)
    }
}

/// A registered subscriber, its banked demand, and strategy-specific state.
pub(crate) struct Member<T, X> {
    pub(crate) subscriber: Arc<dyn Subscriber<T>>,
    pub(crate) demand: u64,
    pub(crate) ext: X,
}

/// Ordered set of attached subscribers.
pub(crate) struct Registry<T, X> {
    last: u64,
    members: BTreeMap<SubscriberId, Member<T, X>>,
}

impl<T: 'static, X> Registry<T, X> {
    pub(crate) fn new() -> Self {
        Self {
            last: 0,
            members: BTreeMap::new(),
        }
    }

    /// Adds a subscriber with zero demand and returns its handle.
    pub(crate) fn register(&mut self, subscriber: Arc<dyn Subscriber<T>>, ext: X) -> SubscriberId {
        self.last += 1;
        let id = SubscriberId(self.last);
        self.members.insert(
            id,
            Member {
                subscriber,
                demand: 0,
                ext,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: SubscriberId) -> Option<&Member<T, X>> {
        self.members.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SubscriberId) -> Option<&mut Member<T, X>> {
        self.members.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: SubscriberId) -> Option<Member<T, X>> {
        self.members.remove(&id)
    }

    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.members.contains_key(&id)
    }

    /// Adds `n` to the member's demand. Returns `false` if the member is gone.
    pub(crate) fn credit(&mut self, id: SubscriberId, n: u64) -> bool {
        match self.members.get_mut(&id) {
            Some(member) => {
                member.demand = member.demand.saturating_add(n);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&SubscriberId, &Member<T, X>)> {
        self.members.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&SubscriberId, &mut Member<T, X>)> {
        self.members.iter_mut()
    }

    /// Name of a member's subscriber, for events.
    pub(crate) fn name_of(&self, id: SubscriberId) -> Option<&'static str> {
        self.members.get(&id).map(|m| m.subscriber.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Recorder;

    fn registry() -> Registry<u32, ()> {
        Registry::new()
    }

    #[test]
    fn test_ids_follow_subscription_order() {
        let mut reg = registry();
        let a = reg.register(Recorder::<u32>::arc(), ());
        let b = reg.register(Recorder::<u32>::arc(), ());
        let c = reg.register(Recorder::<u32>::arc(), ());

        reg.remove(b);
        let d = reg.register(Recorder::<u32>::arc(), ());

        assert_eq!(reg.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![a, c, d]);
        assert!(d > c, "handles must never be reused");
        assert_ne!(a, SubscriberId::DETACHED);
    }

    #[test]
    fn test_credit_saturates() {
        let mut reg = registry();
        let id = reg.register(Recorder::<u32>::arc(), ());
        assert!(reg.credit(id, u64::MAX - 1));
        assert!(reg.credit(id, 10));
        assert_eq!(reg.get(id).map(|m| m.demand), Some(u64::MAX));
    }

    #[test]
    fn test_credit_unknown_member() {
        let mut reg = registry();
        let id = reg.register(Recorder::<u32>::arc(), ());
        reg.remove(id);
        assert!(!reg.credit(id, 1));
        assert!(!reg.contains(id));
        assert!(reg.is_empty());
    }
}

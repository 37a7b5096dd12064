//! # Pull producers.
//!
//! A [`Puller`] is asked for up to `n` signals at a time. Direct strategies obtain
//! one puller per subscriber, shared strategies one per instance, both lazily from
//! a [`PullFactory`].

use std::sync::Arc;

use crate::signal::Signal;

/// Per-subscriber (direct) or per-instance (shared) pull function.
pub type Puller<T> = Box<dyn FnMut(u64) -> Vec<Signal<T>> + Send>;

/// Creates pullers on demand.
pub type PullFactory<T> = Arc<dyn Fn() -> Puller<T> + Send + Sync>;

/// Turns an iterator into a puller that honours the requested amount.
///
/// Yields at most `n` values per call and appends [`Signal::Complete`] as soon as
/// the iterator is exhausted, so completion never waits for extra demand.
///
/// # Example
/// ```
/// use backflow::{iter_puller, Signal};
///
/// let mut pull = iter_puller(vec![1, 2, 3]);
/// assert_eq!(pull(2).len(), 2);
/// let rest = pull(5);
/// assert!(matches!(rest.as_slice(), [Signal::Value(3), Signal::Complete]));
/// ```
pub fn iter_puller<T, I>(values: I) -> impl FnMut(u64) -> Vec<Signal<T>> + Send + 'static
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + 'static,
{
    let mut iter = values.into_iter().peekable();
    let mut done = false;
    move |n| {
        if done {
            return Vec::new();
        }
        let take = usize::try_from(n).unwrap_or(usize::MAX);
        let mut batch: Vec<Signal<T>> = iter.by_ref().take(take).map(Signal::Value).collect();
        if iter.peek().is_none() {
            batch.push(Signal::Complete);
            done = true;
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respects_requested_amount() {
        let mut pull = iter_puller(0..10);
        let batch = pull(3);
        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|s| !s.is_terminal()));
    }

    #[test]
    fn test_empty_iterator_completes_immediately() {
        let mut pull = iter_puller(Vec::<u8>::new());
        assert!(matches!(pull(1).as_slice(), [Signal::Complete]));
        assert!(pull(1).is_empty(), "nothing after completion");
    }

    #[test]
    fn test_completion_follows_last_value() {
        let mut pull = iter_puller(vec!["a", "b"]);
        let batch = pull(2);
        assert!(matches!(
            batch.as_slice(),
            [Signal::Value("a"), Signal::Value("b"), Signal::Complete]
        ));
    }
}

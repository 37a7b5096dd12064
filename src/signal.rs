//! # Signal model.
//!
//! A [`Signal`] is the unit exchanged between producers and the engine:
//! a value, an error, or completion. Error and completion are terminal.

use crate::error::FlowError;

/// One message emitted by a producer.
#[derive(Debug, Clone)]
pub enum Signal<T> {
    /// A payload.
    Value(T),
    /// Terminal failure.
    Error(FlowError),
    /// Terminal success.
    Complete,
}

impl<T> Signal<T> {
    /// Builds a terminal error signal from any producer failure.
    pub fn error<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Signal::Error(FlowError::producer(cause))
    }

    /// Returns `true` for [`Signal::Error`] and [`Signal::Complete`].
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Signal::Value(_))
    }
}

impl<T> From<T> for Signal<T> {
    fn from(value: T) -> Self {
        Signal::Value(value)
    }
}

/// Terminal state stored by shared strategies until every pending subscriber
/// has drained its backlog.
#[derive(Debug, Clone)]
pub(crate) enum Terminal {
    Complete,
    Error(FlowError),
}

impl Terminal {
    pub(crate) fn from_signal<T>(signal: Signal<T>) -> Option<Self> {
        match signal {
            Signal::Value(_) => None,
            Signal::Error(e) => Some(Terminal::Error(e)),
            Signal::Complete => Some(Terminal::Complete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(!Signal::Value(1).is_terminal());
        assert!(Signal::<u8>::Complete.is_terminal());
        assert!(Signal::<u8>::Error(FlowError::msg("x")).is_terminal());
    }

    #[test]
    fn test_terminal_from_signal() {
        assert!(Terminal::from_signal(Signal::Value(3)).is_none());
        assert!(matches!(
            Terminal::from_signal::<u8>(Signal::Complete),
            Some(Terminal::Complete)
        ));
        let t = Terminal::from_signal::<u8>(Signal::error(std::io::Error::other("x")));
        assert!(matches!(t, Some(Terminal::Error(FlowError::Producer(_)))));
    }
}

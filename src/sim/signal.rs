//! Typed observer signals
//!
//! Listeners run synchronously, in registration order, during the
//! `BlocksManager::update` call that produced the event.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::{GameResult, Status};

/// A committed state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub status: Status,
    pub result: GameResult,
    pub level: u8,
}

/// Which result animation finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultAnimationKind {
    Complete,
    Stop,
    Error,
}

type Listener<T> = Box<dyn FnMut(&T)>;

/// A list of listeners for one event type
pub struct Signal<T> {
    listeners: Vec<Listener<T>>,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T> Signal<T> {
    pub fn add<F>(&mut self, listener: F)
    where
        F: FnMut(&T) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn dispatch(&mut self, event: &T) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

/// All signals the orchestrator fires
#[derive(Debug, Default)]
pub struct Signals {
    /// Committed state transitions
    pub state: Signal<StateChange>,
    /// A block was taken from the pool (payload: block id)
    pub spawn: Signal<usize>,
    /// A cycle completed (payload: index of the cycle that ended)
    pub end_cycle: Signal<u64>,
    /// A result animation reached its end
    pub animation_end: Signal<ResultAnimationKind>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_dispatch_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signal: Signal<u64> = Signal::default();

        let a = Rc::clone(&seen);
        signal.add(move |v| a.borrow_mut().push(("a", *v)));
        let b = Rc::clone(&seen);
        signal.add(move |v| b.borrow_mut().push(("b", *v)));

        signal.dispatch(&7);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
        assert_eq!(signal.len(), 2);

        signal.clear();
        signal.dispatch(&8);
        assert_eq!(seen.borrow().len(), 2);
        assert!(signal.is_empty());
    }
}

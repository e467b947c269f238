//! The single-settlement cell underneath every promise.
//!
//! A cell settles at most once; the first settlement wins and later attempts
//! are silently ignored. Continuations registered before settlement are
//! dispatched as one batch, in registration order, through the scheduler.

use crate::error::Rejection;
use crate::scheduler::Scheduler;

/// A settled value or rejection.
pub(crate) type Outcome<T> = Result<T, Rejection>;

/// A continuation waiting on settlement.
pub(crate) type Waiter<T> = Box<dyn FnOnce(Outcome<T>) + Send>;

enum State<T> {
    Pending(Vec<Waiter<T>>),
    Settled(Outcome<T>),
}

pub(crate) struct Cell<T> {
    state: spin::Mutex<State<T>>,
}

impl<T: Clone + Send + 'static> Cell<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: spin::Mutex::new(State::Pending(Vec::new())),
        }
    }

    /// Settles the cell, waking all registered waiters in registration
    /// order. A no-op if already settled.
    pub(crate) fn settle(&self, scheduler: &Scheduler, outcome: Outcome<T>) {
        let waiters = {
            let mut state = self.state.lock();
            match core::mem::replace(&mut *state, State::Settled(outcome.clone())) {
                State::Pending(waiters) => waiters,
                State::Settled(first) => {
                    // First settlement wins; put it back.
                    *state = State::Settled(first);
                    return;
                }
            }
        };

        if waiters.is_empty() {
            return;
        }

        // One dispatch for the whole batch keeps registration order intact
        // in deferred mode.
        scheduler.run(move || {
            for waiter in waiters {
                waiter(outcome.clone());
            }
        });
    }

    /// Registers a waiter. If the cell is already settled the waiter is
    /// dispatched immediately with a clone of the outcome.
    pub(crate) fn subscribe(&self, scheduler: &Scheduler, waiter: Waiter<T>) {
        let outcome = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending(waiters) => {
                    waiters.push(waiter);
                    return;
                }
                State::Settled(outcome) => outcome.clone(),
            }
        };
        scheduler.run(move || waiter(outcome));
    }

    /// A clone of the settled outcome, or `None` while pending.
    pub(crate) fn peek(&self) -> Option<Outcome<T>> {
        match &*self.state.lock() {
            State::Pending(_) => None,
            State::Settled(outcome) => Some(outcome.clone()),
        }
    }
}

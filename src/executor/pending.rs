//! Single-assignment results with attached continuations
//!
//! A [`PendingResult`] is fired at most once. Continuations attached
//! before firing run in attachment order when it resolves; continuations
//! attached afterwards run immediately. A result may also be fired with
//! another pending result, in which case it counts as fired straight away
//! but only resolves once the other one does.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

use crate::models::{EngineError, Failure};

/// Final value of a phase or of any chained step
pub type Outcome<T> = Result<T, Failure>;

/// What a continuation hands back to the chain
pub enum Chained<T> {
    /// The next outcome is known now
    Ready(Outcome<T>),
    /// The chain resolves when this result does
    Pending(PendingResult<T>),
}

impl<T> From<Outcome<T>> for Chained<T> {
    fn from(outcome: Outcome<T>) -> Self {
        Chained::Ready(outcome)
    }
}

impl<T> From<PendingResult<T>> for Chained<T> {
    fn from(result: PendingResult<T>) -> Self {
        Chained::Pending(result)
    }
}

type Continuation<T> = Box<dyn FnOnce(&Outcome<T>)>;

enum State<T> {
    Pending,
    /// Fired with another result that has not resolved yet
    Waiting,
    Resolved(Outcome<T>),
}

struct Inner<T> {
    state: State<T>,
    continuations: VecDeque<Continuation<T>>,
    draining: bool,
}

/// Future-like handle holding at most one final outcome
pub struct PendingResult<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for PendingResult<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Default for PendingResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> PendingResult<T> {
    /// Create a new pending result
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Pending,
                continuations: VecDeque::new(),
                draining: false,
            })),
        }
    }

    /// Create a result that is already resolved with `outcome`
    pub fn resolved(outcome: Outcome<T>) -> Self {
        let result = Self::new();
        result.inner.borrow_mut().state = State::Resolved(outcome);
        result
    }

    pub fn succeed(value: T) -> Self {
        Self::resolved(Ok(value))
    }

    pub fn fail(failure: Failure) -> Self {
        Self::resolved(Err(failure))
    }

    /// Permanently assign the outcome and run queued continuations
    pub fn fire(&self, outcome: Outcome<T>) -> Result<(), EngineError> {
        {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, State::Pending) {
                return Err(EngineError::AlreadyFired);
            }
            inner.state = State::Resolved(outcome);
        }
        self.drain();
        Ok(())
    }

    /// Fire with another result; this one resolves when `other` does
    pub fn fire_with(&self, other: PendingResult<T>) -> Result<(), EngineError> {
        {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, State::Pending) {
                return Err(EngineError::AlreadyFired);
            }
            inner.state = State::Waiting;
        }
        let this = self.clone();
        other.on_complete(move |outcome| this.settle(outcome.clone()));
        Ok(())
    }

    /// Register a continuation invoked with the final outcome
    pub fn on_complete(&self, continuation: impl FnOnce(&Outcome<T>) + 'static) {
        let mut inner = self.inner.borrow_mut();
        let ready = match &inner.state {
            State::Resolved(outcome) if !inner.draining => Some(outcome.clone()),
            _ => None,
        };
        match ready {
            Some(outcome) => {
                drop(inner);
                continuation(&outcome);
            }
            None => inner.continuations.push_back(Box::new(continuation)),
        }
    }

    /// Chain a step producing either a ready outcome or another pending result
    pub fn then<U, F>(&self, step: F) -> PendingResult<U>
    where
        U: Clone + 'static,
        F: FnOnce(Outcome<T>) -> Chained<U> + 'static,
    {
        let next = PendingResult::new();
        let target = next.clone();
        self.on_complete(move |outcome| {
            let delivered = match step(outcome.clone()) {
                Chained::Ready(outcome) => target.fire(outcome),
                Chained::Pending(result) => target.fire_with(result),
            };
            if delivered.is_err() {
                debug!("Discarding late resolution of a superseded result");
            }
        });
        next
    }

    /// Chain a step that transforms the outcome synchronously
    pub fn map<U, F>(&self, step: F) -> PendingResult<U>
    where
        U: Clone + 'static,
        F: FnOnce(Outcome<T>) -> Outcome<U> + 'static,
    {
        self.then(move |outcome| Chained::Ready(step(outcome)))
    }

    /// True once `fire` or `fire_with` succeeded
    pub fn is_fired(&self) -> bool {
        !matches!(self.inner.borrow().state, State::Pending)
    }

    /// True once the final outcome is known
    pub fn is_resolved(&self) -> bool {
        matches!(self.inner.borrow().state, State::Resolved(_))
    }

    /// The final outcome, if known
    pub fn outcome(&self) -> Option<Outcome<T>> {
        match &self.inner.borrow().state {
            State::Resolved(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    fn settle(&self, outcome: Outcome<T>) {
        self.inner.borrow_mut().state = State::Resolved(outcome);
        self.drain();
    }

    fn drain(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.draining {
                return;
            }
            inner.draining = true;
        }
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let outcome = match &inner.state {
                    State::Resolved(outcome) => Some(outcome.clone()),
                    _ => None,
                };
                let next = outcome.and_then(|outcome| {
                    inner
                        .continuations
                        .pop_front()
                        .map(|continuation| (continuation, outcome))
                });
                if next.is_none() {
                    inner.draining = false;
                }
                next
            };
            match next {
                Some((continuation, outcome)) => continuation(&outcome),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;
    use std::cell::Cell;

    #[test]
    fn test_fire_twice_is_already_fired() {
        let result = PendingResult::new();
        assert_eq!(result.fire(Ok(1)), Ok(()));
        assert_eq!(result.fire(Ok(2)), Err(EngineError::AlreadyFired));
        assert_eq!(
            result.fire(Err(Failure::assertion("late"))),
            Err(EngineError::AlreadyFired)
        );
        assert_eq!(result.outcome(), Some(Ok(1)));
    }

    #[test]
    fn test_continuations_run_in_attachment_order() {
        let result = PendingResult::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3 {
            let seen = seen.clone();
            result.on_complete(move |outcome| seen.borrow_mut().push((tag, outcome.clone())));
        }
        assert!(seen.borrow().is_empty());

        result.fire(Ok(7)).unwrap();
        assert_eq!(*seen.borrow(), vec![(0, Ok(7)), (1, Ok(7)), (2, Ok(7))]);
    }

    #[test]
    fn test_continuations_after_firing_run_immediately() {
        let result = PendingResult::<()>::fail(Failure::unhandled("boom"));
        let calls = Rc::new(Cell::new(0));
        for _ in 0..5 {
            let calls = calls.clone();
            result.on_complete(move |outcome| {
                assert_eq!(outcome.as_ref().unwrap_err().message(), "boom");
                calls.set(calls.get() + 1);
            });
        }
        assert_eq!(calls.get(), 5);
    }

    #[test]
    fn test_continuation_attached_while_draining_keeps_order() {
        let result = PendingResult::<()>::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let (inner_result, inner_order) = (result.clone(), order.clone());
        result.on_complete(move |_| {
            inner_order.borrow_mut().push("first");
            let late = inner_order.clone();
            inner_result.on_complete(move |_| late.borrow_mut().push("attached during drain"));
        });
        let second = order.clone();
        result.on_complete(move |_| second.borrow_mut().push("second"));

        result.fire(Ok(())).unwrap();
        assert_eq!(
            *order.borrow(),
            vec!["first", "second", "attached during drain"]
        );
    }

    #[test]
    fn test_then_chains_on_pending_result() {
        let first = PendingResult::<u32>::new();
        let inner = PendingResult::<String>::new();
        let handed_out = inner.clone();
        let chained = first.then(move |outcome| {
            assert_eq!(outcome, Ok(2));
            Chained::Pending(handed_out)
        });

        first.fire(Ok(2)).unwrap();
        assert!(chained.is_fired());
        assert!(!chained.is_resolved());

        inner.fire(Ok("done".to_string())).unwrap();
        assert_eq!(chained.outcome(), Some(Ok("done".to_string())));
    }

    #[test]
    fn test_waiting_result_rejects_fire() {
        let result = PendingResult::<()>::new();
        result.fire_with(PendingResult::new()).unwrap();
        assert!(result.is_fired());
        assert_eq!(
            result.fire(Err(Failure::timeout("too slow"))),
            Err(EngineError::AlreadyFired)
        );
    }

    #[test]
    fn test_map_propagates_failure() {
        let result = PendingResult::<u32>::new();
        let mapped = result.map(|outcome| outcome.map(|v| v * 2));
        result.fire(Err(Failure::skip("later"))).unwrap();
        assert_eq!(
            mapped.outcome().unwrap().unwrap_err().kind(),
            FailureKind::Skip
        );
    }
}

//! Blocking wait on a pending result
//!
//! The bridge lets a synchronous caller block until a pending result
//! resolves, driving the event loop in the meantime. Only one wait may be
//! in flight per bridge.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

use super::{Outcome, PendingResult, TimeoutFlag};
use crate::models::EngineError;
use crate::reactor::EventLoop;

/// Clears the in-flight marker on every exit path
struct WaitToken(Rc<Cell<bool>>);

impl WaitToken {
    fn acquire(in_flight: &Rc<Cell<bool>>) -> Result<Self, EngineError> {
        if in_flight.replace(true) {
            return Err(EngineError::ReentrantWait);
        }
        Ok(Self(Rc::clone(in_flight)))
    }
}

impl Drop for WaitToken {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Drives the event loop from a synchronous call site
#[derive(Clone)]
pub struct BlockingBridge {
    event_loop: EventLoop,
    in_flight: Rc<Cell<bool>>,
}

impl BlockingBridge {
    pub fn new(event_loop: EventLoop) -> Self {
        Self {
            event_loop,
            in_flight: Rc::new(Cell::new(false)),
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.in_flight.get()
    }

    /// Block until `result` resolves.
    ///
    /// Returns the outcome, or `None` when a timeout had to stop the loop
    /// before the result could resolve. Fails with `Interrupted` when the
    /// loop stopped for any other reason.
    pub fn wait_for<T: Clone + 'static>(
        &self,
        result: &PendingResult<T>,
        timed_out: &TimeoutFlag,
    ) -> Result<Option<Outcome<T>>, EngineError> {
        let _token = WaitToken::acquire(&self.in_flight)?;

        let recorded: Rc<RefCell<Option<Outcome<T>>>> = Rc::new(RefCell::new(None));
        let live = Rc::new(Cell::new(true));

        let (slot, open) = (recorded.clone(), live.clone());
        result.on_complete(move |outcome| {
            if open.get() {
                *slot.borrow_mut() = Some(outcome.clone());
            }
        });

        let waited = self.drive(result, &recorded, &live, timed_out);
        live.set(false);
        waited
    }

    fn drive<T: Clone + 'static>(
        &self,
        result: &PendingResult<T>,
        recorded: &Rc<RefCell<Option<Outcome<T>>>>,
        live: &Rc<Cell<bool>>,
        timed_out: &TimeoutFlag,
    ) -> Result<Option<Outcome<T>>, EngineError> {
        if let Some(outcome) = recorded.borrow_mut().take() {
            return Ok(Some(outcome));
        }

        let (event_loop, open) = (self.event_loop.clone(), live.clone());
        result.on_complete(move |_| {
            if open.get() {
                event_loop.stop();
            }
        });

        debug!("Driving event loop until the awaited result resolves");
        self.event_loop.run();

        if let Some(outcome) = recorded.borrow_mut().take() {
            return Ok(Some(outcome));
        }
        if timed_out.is_set() {
            return Ok(None);
        }
        Err(EngineError::Interrupted)
    }
}

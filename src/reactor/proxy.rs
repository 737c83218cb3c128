//! Event loop proxy handed to running tests
//!
//! Tests never see the raw [`EventLoop`]. The proxy forwards scheduling,
//! warns when a test tries to stop or crash the loop, and remembers every
//! delayed call so the runner can detect a test that left work behind.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tracing::warn;

use super::{DelayedCall, EventLoop};
use crate::executor::{Outcome, PendingResult};

/// Loop control surface available to a test
#[derive(Clone)]
pub struct TestReactor {
    event_loop: EventLoop,
    scheduled: Rc<RefCell<Vec<DelayedCall>>>,
}

impl TestReactor {
    pub fn new(event_loop: EventLoop) -> Self {
        Self {
            event_loop,
            scheduled: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn call_later(&self, delay: Duration, callback: impl FnOnce() + 'static) -> DelayedCall {
        let call = self.event_loop.call_later(delay, callback);
        let mut scheduled = self.scheduled.borrow_mut();
        scheduled.retain(DelayedCall::active);
        scheduled.push(call.clone());
        call
    }

    pub fn defer_to_thread<T, F>(&self, work: F) -> PendingResult<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> Outcome<T> + Send + 'static,
    {
        self.event_loop.defer_to_thread(work)
    }

    pub fn spawn_local<T, F>(&self, future: F) -> PendingResult<T>
    where
        T: Clone + 'static,
        F: Future<Output = Outcome<T>> + 'static,
    {
        self.event_loop.spawn_local(future)
    }

    /// Forwarded, but tests should not stop the loop themselves
    pub fn stop(&self) {
        warn!("reactor.stop cannot be used inside unit tests");
        self.event_loop.stop();
    }

    /// Forwarded, but tests should not crash the loop themselves
    pub fn crash(&self) {
        warn!("reactor.crash cannot be used inside unit tests");
        self.event_loop.crash();
    }

    /// Cancel every pending delayed call; returns how many were cancelled
    pub fn cancel_pending(&self) -> usize {
        let calls: Vec<DelayedCall> = self.scheduled.borrow_mut().drain(..).collect();
        calls.iter().filter(|call| call.cancel()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_tracks_and_cancels_pending_calls() {
        let event_loop = EventLoop::new().unwrap();
        let reactor = TestReactor::new(event_loop.clone());

        let ran = Rc::new(Cell::new(0));
        let counter = ran.clone();
        reactor.call_later(Duration::from_millis(1), move || counter.set(counter.get() + 1));
        reactor.call_later(Duration::from_secs(60), || {});

        let stopper = event_loop.clone();
        event_loop.call_later(Duration::from_millis(20), move || stopper.stop());
        event_loop.run();

        assert_eq!(ran.get(), 1);
        assert_eq!(reactor.cancel_pending(), 1);
        assert_eq!(reactor.cancel_pending(), 0);
    }

    #[test]
    fn test_stop_is_forwarded() {
        let event_loop = EventLoop::new().unwrap();
        let reactor = TestReactor::new(event_loop.clone());

        let proxy = reactor.clone();
        event_loop.call_later(Duration::from_millis(1), move || proxy.stop());
        event_loop.run();
        assert!(!event_loop.is_running());
    }
}

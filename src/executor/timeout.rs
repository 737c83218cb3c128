//! Per-phase timeout guard
//!
//! The guard races a delayed call against the guarded result. Whichever
//! happens first wins; the other side becomes a no-op.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};

use super::PendingResult;
use crate::models::{Failure, Todo};
use crate::reactor::{DelayedCall, EventLoop};
use crate::results::ResultSink;
use crate::utils::Timer;

/// Set when a timeout had to force the loop to stop
#[derive(Clone, Debug, Default)]
pub struct TimeoutFlag(Rc<Cell<bool>>);

impl TimeoutFlag {
    pub fn set(&self) {
        self.0.set(true);
    }

    pub fn is_set(&self) -> bool {
        self.0.get()
    }
}

/// Scheduled timeout for one guarded result
#[derive(Debug)]
pub struct TimeoutGuard {
    call: DelayedCall,
}

impl TimeoutGuard {
    /// Schedule `on_timeout` after `timeout` unless `result` resolves first
    pub fn arm<T, F>(
        event_loop: &EventLoop,
        result: &PendingResult<T>,
        timeout: Duration,
        on_timeout: F,
    ) -> Self
    where
        T: Clone + 'static,
        F: FnOnce(&PendingResult<T>) + 'static,
    {
        let target = result.clone();
        let call = event_loop.call_later(timeout, move || on_timeout(&target));

        let scheduled = call.clone();
        result.on_complete(move |_| {
            if scheduled.cancel() {
                debug!("Cancelled timeout call {}", scheduled.id());
            }
        });

        Self { call }
    }

    /// True while the timeout can still fire
    pub fn is_armed(&self) -> bool {
        self.call.active()
    }
}

/// What a phase timeout needs to report itself
pub(crate) struct Expiry {
    pub test: String,
    pub description: String,
    pub timeout: Duration,
    pub timer: Timer,
    pub event_loop: EventLoop,
    pub timed_out: TimeoutFlag,
    pub superseded: Rc<Cell<bool>>,
    pub todo: Option<Todo>,
    pub sink: Rc<dyn ResultSink>,
}

impl Expiry {
    /// Fail the guarded result with a timeout, or force the loop to stop if
    /// the result already fired but its chain has not finished.
    pub fn expire(self, target: &PendingResult<()>) {
        let failure = Failure::timeout(format!(
            "{} ({}) still running at {} secs",
            self.test,
            self.description,
            self.timeout.as_secs_f64()
        ));
        debug!(
            "{} timed out after {}ms",
            self.description,
            self.timer.elapsed_ms()
        );

        if target.fire(Err(failure.clone())).is_ok() {
            return;
        }

        warn!(
            "{} ({}) fired before its deadline but its chain is still running; stopping the loop",
            self.test, self.description
        );
        self.superseded.set(true);
        self.event_loop.crash();
        self.timed_out.set();
        match &self.todo {
            Some(todo) if todo.expected(&failure) => {
                self.sink.add_expected_failure(&self.test, &failure, todo)
            }
            _ => self.sink.add_error(&self.test, &failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::RecordingSink;
    use crate::models::{FailureKind, TestOutcome};

    fn expiry(event_loop: &EventLoop, sink: Rc<RecordingSink>, flag: TimeoutFlag) -> Expiry {
        Expiry {
            test: "test_slow".to_string(),
            description: "test_slow".to_string(),
            timeout: Duration::from_millis(10),
            timer: Timer::start("test_slow"),
            event_loop: event_loop.clone(),
            timed_out: flag,
            superseded: Rc::new(Cell::new(false)),
            todo: None,
            sink,
        }
    }

    #[test]
    fn test_early_completion_cancels_timer() {
        let event_loop = EventLoop::new().unwrap();
        let result = PendingResult::<()>::new();
        let guard = TimeoutGuard::arm(&event_loop, &result, Duration::from_secs(60), |_| {
            panic!("timeout must not fire")
        });
        assert!(guard.is_armed());

        result.fire(Ok(())).unwrap();
        assert!(!guard.is_armed());
    }

    #[test]
    fn test_deadline_fails_pending_result() {
        let event_loop = EventLoop::new().unwrap();
        let sink = Rc::new(RecordingSink::new());
        let flag = TimeoutFlag::default();
        let result = PendingResult::<()>::new();

        let expiry = expiry(&event_loop, sink.clone(), flag.clone());
        TimeoutGuard::arm(&event_loop, &result, Duration::from_millis(10), move |target| {
            expiry.expire(target)
        });
        let stopper = event_loop.clone();
        result.on_complete(move |_| stopper.stop());
        event_loop.run();

        let failure = result.outcome().unwrap().unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Timeout);
        assert_eq!(
            failure.message(),
            "test_slow (test_slow) still running at 0.01 secs"
        );
        assert!(!flag.is_set());
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_already_fired_forces_loop_stop() {
        let event_loop = EventLoop::new().unwrap();
        let sink = Rc::new(RecordingSink::new());
        let flag = TimeoutFlag::default();

        let result = PendingResult::<()>::new();
        result.fire_with(PendingResult::new()).unwrap();

        let expiry = expiry(&event_loop, sink.clone(), flag.clone());
        let superseded = Rc::clone(&expiry.superseded);
        TimeoutGuard::arm(&event_loop, &result, Duration::from_millis(10), move |target| {
            expiry.expire(target)
        });
        event_loop.run();

        assert!(event_loop.was_crashed());
        assert!(flag.is_set());
        assert!(superseded.get());
        assert_eq!(sink.outcomes_for("test_slow"), vec![TestOutcome::Errored]);
    }
}

//! Runs one fixture phase under a timeout

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

use super::timeout::Expiry;
use super::{PendingResult, TimeoutFlag, TimeoutGuard};
use crate::case::{Action, TestContext};
use crate::models::Todo;
use crate::reactor::EventLoop;
use crate::results::ResultSink;
use crate::utils::Timer;

/// Executes setUp, test body, tearDown and single cleanups for one test
#[derive(Clone)]
pub struct PhaseRunner {
    event_loop: EventLoop,
    context: TestContext,
    timeout: Duration,
    todo: Option<Todo>,
    sink: Rc<dyn ResultSink>,
    timed_out: TimeoutFlag,
    superseded: Rc<Cell<bool>>,
}

impl PhaseRunner {
    pub fn new(
        event_loop: EventLoop,
        context: TestContext,
        timeout: Duration,
        sink: Rc<dyn ResultSink>,
    ) -> Self {
        Self {
            event_loop,
            context,
            timeout,
            todo: None,
            sink,
            timed_out: TimeoutFlag::default(),
            superseded: Rc::new(Cell::new(false)),
        }
    }

    pub fn with_todo(mut self, todo: Option<Todo>) -> Self {
        self.todo = todo;
        self
    }

    pub fn with_timeout_flag(mut self, flag: TimeoutFlag) -> Self {
        self.timed_out = flag;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn timed_out(&self) -> &TimeoutFlag {
        &self.timed_out
    }

    /// Mark the test as finished; late resolutions of its phases are dropped
    pub fn supersede(&self) {
        self.superseded.set(true);
    }

    pub fn is_superseded(&self) -> bool {
        self.superseded.get()
    }

    /// Start `action` and guard its outcome with the phase timeout.
    ///
    /// Actions of an invalid shape fail at once and arm no timeout.
    pub fn run(&self, action: Action, description: &str) -> PendingResult<()> {
        if !action.is_valid_shape() {
            return action.invoke(&self.context, description);
        }

        debug!("Running {} ({} action)", description, action.shape());
        let timer = Timer::start(description);
        let result = action.invoke(&self.context, description);

        let expiry = Expiry {
            test: self.context.id().to_string(),
            description: description.to_string(),
            timeout: self.timeout,
            timer,
            event_loop: self.event_loop.clone(),
            timed_out: self.timed_out.clone(),
            superseded: Rc::clone(&self.superseded),
            todo: self.todo.clone(),
            sink: Rc::clone(&self.sink),
        };
        TimeoutGuard::arm(&self.event_loop, &result, self.timeout, move |target| {
            expiry.expire(target)
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Failure, FailureKind};
    use crate::reactor::TestReactor;
    use crate::results::RecordingSink;

    fn runner(timeout: Duration) -> (EventLoop, PhaseRunner) {
        let event_loop = EventLoop::new().unwrap();
        let context = TestContext::new("test_phase", TestReactor::new(event_loop.clone()));
        let sink: Rc<dyn ResultSink> = Rc::new(RecordingSink::new());
        let runner = PhaseRunner::new(event_loop.clone(), context, timeout, sink);
        (event_loop, runner)
    }

    fn run_to_completion(event_loop: &EventLoop, result: &PendingResult<()>) {
        if result.is_resolved() {
            return;
        }
        let stopper = event_loop.clone();
        result.on_complete(move |_| stopper.stop());
        event_loop.run();
    }

    #[test]
    fn test_sync_failure_is_wrapped() {
        let (_loop, runner) = runner(Duration::from_secs(5));
        let result = runner.run(Action::call(|_| Err(Failure::unhandled("boom"))), "setUp");
        assert_eq!(
            result.outcome().unwrap().unwrap_err().kind(),
            FailureKind::Unhandled
        );
    }

    #[test]
    fn test_deferred_action_resolves_on_loop() {
        let (event_loop, runner) = runner(Duration::from_secs(5));
        let result = runner.run(
            Action::deferred(|ctx| {
                let result = PendingResult::new();
                let target = result.clone();
                ctx.reactor().call_later(Duration::from_millis(5), move || {
                    let _ = target.fire(Ok(()));
                });
                result
            }),
            "test_later",
        );
        assert!(!result.is_fired());

        run_to_completion(&event_loop, &result);
        assert_eq!(result.outcome(), Some(Ok(())));
    }

    #[test]
    fn test_async_action_times_out() {
        let (event_loop, runner) = runner(Duration::from_millis(20));
        let result = runner.run(
            Action::future(|_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }),
            "test_hang",
        );

        run_to_completion(&event_loop, &result);
        let failure = result.outcome().unwrap().unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Timeout);
        assert!(failure.message().contains("(test_hang) still running"));
    }

    #[test]
    fn test_invalid_shape_fails_without_timeout() {
        let (_loop, runner) = runner(Duration::from_millis(1));
        let result = runner.run(Action::steps(|_| std::iter::empty()), "test_gen");
        assert_eq!(
            result.outcome().unwrap().unwrap_err().kind(),
            FailureKind::InvalidTestShape
        );
    }
}

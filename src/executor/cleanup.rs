//! Cleanup stack
//!
//! Cleanups registered during a test are unwound last-registered-first.
//! A failing cleanup never stops the ones after it; every failure is
//! collected and handed back together.

use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

use super::{Chained, Outcome, PendingResult, PhaseRunner};
use crate::case::Action;
use crate::models::Failure;

/// A deferred action with a human-readable description
#[derive(Debug)]
pub struct CleanupAction {
    pub description: String,
    pub action: Action,
}

/// Ordered, mutable list of cleanup actions
#[derive(Clone, Default)]
pub struct CleanupStack {
    entries: Rc<RefCell<Vec<CleanupAction>>>,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push onto the top of the stack
    pub fn push(&self, description: impl Into<String>, action: Action) {
        self.entries.borrow_mut().push(CleanupAction {
            description: description.into(),
            action,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn pop(&self) -> Option<CleanupAction> {
        self.entries.borrow_mut().pop()
    }

    /// Run every entry, top first, and collect their failures.
    ///
    /// Cleanups pushed while draining run too.
    pub fn drain(&self, runner: &PhaseRunner) -> PendingResult<Vec<Failure>> {
        debug!("Draining {} cleanup(s)", self.len());
        drain_from(self.clone(), runner.clone(), Vec::new())
    }
}

fn drain_from(
    stack: CleanupStack,
    runner: PhaseRunner,
    mut failures: Vec<Failure>,
) -> PendingResult<Vec<Failure>> {
    // Cleanups that resolve at once unwind in this loop; only a pending one
    // hands the rest of the unwind to its continuation.
    while !runner.is_superseded() {
        let Some(entry) = stack.pop() else {
            break;
        };

        let description = format!("cleanup function {}", entry.description);
        let result = runner.run(entry.action, &description);
        match result.outcome() {
            Some(outcome) => collect(&mut failures, outcome),
            None => {
                return result.then(move |outcome| {
                    collect(&mut failures, outcome);
                    Chained::Pending(drain_from(stack, runner, failures))
                });
            }
        }
    }

    PendingResult::succeed(failures)
}

fn collect(failures: &mut Vec<Failure>, outcome: Outcome<()>) {
    if let Err(failure) = outcome {
        debug!("Cleanup failed: {}", failure);
        failures.push(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::TestContext;
    use crate::reactor::{EventLoop, TestReactor};
    use crate::results::{RecordingSink, ResultSink};
    use std::cell::Cell;
    use std::time::Duration;

    fn runner() -> (EventLoop, TestContext, PhaseRunner) {
        let event_loop = EventLoop::new().unwrap();
        let context = TestContext::new("test_cleanup", TestReactor::new(event_loop.clone()));
        let sink: Rc<dyn ResultSink> = Rc::new(RecordingSink::new());
        let runner = PhaseRunner::new(
            event_loop.clone(),
            context.clone(),
            Duration::from_secs(5),
            sink,
        );
        (event_loop, context, runner)
    }

    #[test]
    fn test_unwinds_in_reverse_and_keeps_going_after_failures() {
        let (_loop, context, runner) = runner();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..5 {
            let order = order.clone();
            context.add_cleanup(
                format!("cleanup_{i}"),
                Action::call(move |_| {
                    order.borrow_mut().push(i);
                    if i % 2 == 1 {
                        Err(Failure::unhandled(format!("cleanup {i} failed")))
                    } else {
                        Ok(())
                    }
                }),
            );
        }

        let failures = context.cleanups().drain(&runner).outcome().unwrap().unwrap();
        assert_eq!(*order.borrow(), vec![4, 3, 2, 1, 0]);
        let messages: Vec<_> = failures.iter().map(|f| f.message().to_string()).collect();
        assert_eq!(messages, vec!["cleanup 3 failed", "cleanup 1 failed"]);
        assert!(context.cleanups().is_empty());
    }

    #[test]
    fn test_waits_for_deferred_cleanup_before_the_next() {
        let (event_loop, context, runner) = runner();
        let order = Rc::new(RefCell::new(Vec::new()));

        let first = order.clone();
        context.add_cleanup("sync", Action::call(move |_| {
            first.borrow_mut().push("sync");
            Ok(())
        }));
        let second = order.clone();
        context.add_cleanup(
            "deferred",
            Action::deferred(move |ctx| {
                let result = PendingResult::new();
                let target = result.clone();
                ctx.reactor().call_later(Duration::from_millis(5), move || {
                    second.borrow_mut().push("deferred");
                    let _ = target.fire(Ok(()));
                });
                result
            }),
        );

        let drained = context.cleanups().drain(&runner);
        assert!(order.borrow().is_empty());

        let stopper = event_loop.clone();
        drained.on_complete(move |_| stopper.stop());
        event_loop.run();

        assert_eq!(*order.borrow(), vec!["deferred", "sync"]);
        assert_eq!(drained.outcome(), Some(Ok(Vec::new())));
    }

    #[test]
    fn test_cleanup_registered_while_draining_runs() {
        let (_loop, context, runner) = runner();
        let ran = Rc::new(RefCell::new(Vec::new()));

        let late = ran.clone();
        context.add_cleanup(
            "outer",
            Action::call(move |ctx| {
                let late = late.clone();
                ctx.add_cleanup("inner", Action::call(move |_| {
                    late.borrow_mut().push("inner");
                    Ok(())
                }));
                Ok(())
            }),
        );

        context.cleanups().drain(&runner);
        assert_eq!(*ran.borrow(), vec!["inner"]);
    }

    #[test]
    fn test_long_synchronous_unwind_runs_every_cleanup() {
        let (_loop, context, runner) = runner();
        let ran = Rc::new(Cell::new(0u32));

        for i in 0..20_000 {
            let ran = ran.clone();
            context.add_cleanup(
                format!("cleanup_{i}"),
                Action::call(move |_| {
                    ran.set(ran.get() + 1);
                    Ok(())
                }),
            );
        }

        let drained = context.cleanups().drain(&runner);
        assert_eq!(drained.outcome(), Some(Ok(Vec::new())));
        assert_eq!(ran.get(), 20_000);
    }

    #[test]
    fn test_superseded_runner_stops_unwinding() {
        let (_loop, context, runner) = runner();
        let ran = Rc::new(Cell::new(0u32));

        for _ in 0..3 {
            let ran = ran.clone();
            context.add_cleanup(
                "count",
                Action::call(move |_| {
                    ran.set(ran.get() + 1);
                    Ok(())
                }),
            );
        }
        runner.supersede();

        let drained = context.cleanups().drain(&runner);
        assert_eq!(drained.outcome(), Some(Ok(Vec::new())));
        assert_eq!(ran.get(), 0);
        assert_eq!(context.cleanups().len(), 3);
    }
}

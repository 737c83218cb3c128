//! Built-in demonstration suite
//!
//! A handful of tests showing how the engine reports each kind of outcome.
//! The suite is deliberately not all green.

use std::time::Duration;

use crate::case::{assert_failure, Action, TestCase};
use crate::config::{Scope, ScopeLevel};
use crate::executor::PendingResult;
use crate::models::{Failure, FailureKind, Todo};

/// The demo suite, in run order
pub fn suite() -> Vec<TestCase> {
    let module = Scope::new(ScopeLevel::Module, "demos").with_timeout(2);

    vec![
        TestCase::new("test_passes", Action::noop()),
        TestCase::new(
            "test_assertion_fails",
            Action::call(|_| Err(Failure::assertion("1 != 2"))),
        ),
        TestCase::new("test_never_reached", Action::noop()).with_set_up(Action::call(|_| {
            Err(Failure::skip("no network"))
        })),
        TestCase::new(
            "test_cleanup_raises",
            Action::call(|ctx| {
                ctx.add_cleanup(
                    "remove temp dir",
                    Action::call(|_| Err(Failure::unhandled("boom"))),
                );
                Ok(())
            }),
        ),
        TestCase::new("test_hangs", Action::deferred(|_| PendingResult::new()))
            .in_scope(module.clone())
            .with_timeout(0.1),
        TestCase::new(
            "test_known_bug",
            Action::call(|_| Err(Failure::assertion("still broken"))),
        )
        .with_todo(Todo::new("issue pending").expecting([FailureKind::Assertion])),
        TestCase::new("test_fixed_bug", Action::noop())
            .with_todo(Todo::new("issue pending").expecting([FailureKind::Assertion])),
        TestCase::new(
            "test_waits_on_loop",
            Action::deferred(|ctx| {
                let result = PendingResult::new();
                let target = result.clone();
                ctx.reactor().call_later(Duration::from_millis(20), move || {
                    let _ = target.fire(Ok(()));
                });
                result
            }),
        )
        .in_scope(module),
        TestCase::new(
            "test_async_body",
            Action::future(|_| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(())
            }),
        ),
        TestCase::new(
            "test_worker_thread",
            Action::deferred(|ctx| {
                ctx.reactor()
                    .defer_to_thread(|| {
                        std::thread::sleep(Duration::from_millis(10));
                        Ok(())
                    })
            }),
        ),
        TestCase::new(
            "test_expects_failure",
            Action::deferred(|_| {
                let failing = PendingResult::<()>::fail(Failure::timeout("gave up"));
                assert_failure(&failing, &[FailureKind::Timeout]).map(|outcome| outcome.map(|_| ()))
            }),
        ),
        TestCase::new(
            "test_leaves_timer_behind",
            Action::call(|ctx| {
                ctx.reactor().call_later(Duration::from_secs(30), || {});
                Ok(())
            }),
        ),
        TestCase::new("test_generator", Action::steps(|_| std::iter::once(Ok(())))),
        TestCase::new("test_skipped_by_config", Action::noop()).with_skip("not on this platform"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use crate::executor::run_suite;
    use crate::models::TestOutcome;

    #[test]
    fn test_demo_suite_outcomes() {
        let cases = suite();
        let total = cases.len();
        let summary = run_suite(RunnerConfig::default(), cases).unwrap();

        assert_eq!(summary.tests_run, total);
        assert!(!summary.stopped);
        assert_eq!(summary.passed, 5);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors, 4);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.expected_failures, 1);
        assert_eq!(summary.unexpected_successes, 1);

        let outcome = |test: &str| {
            summary
                .records
                .iter()
                .find(|r| r.test == test)
                .map(|r| r.outcome)
        };
        assert_eq!(outcome("test_hangs"), Some(TestOutcome::Errored));
        assert_eq!(outcome("test_expects_failure"), Some(TestOutcome::Passed));
    }
}

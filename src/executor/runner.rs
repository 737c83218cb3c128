//! Test execution runner
//!
//! Runs test cases one at a time on a shared event loop and reports their
//! outcomes to a result sink.

use anyhow::Result;
use std::rc::Rc;
use tracing::{error, info, warn};

use super::{BlockingBridge, PhaseRunner, PhaseSequencer, TimeoutFlag};
use crate::case::{TestCase, TestContext};
use crate::config::{resolve_skip, resolve_timeout, resolve_todo, RunnerConfig, Scope};
use crate::models::{EngineError, Failure, RunSummary};
use crate::reactor::{EventLoop, TestReactor};
use crate::results::{RecordingSink, ResultSink};
use crate::utils::logger::test_span;
use crate::utils::Timer;

/// Runs tests and reports into a sink
pub struct TestRunner {
    config: RunnerConfig,
    event_loop: EventLoop,
    bridge: BlockingBridge,
    sink: Rc<dyn ResultSink>,
}

impl TestRunner {
    /// Create a new test runner with its own event loop
    pub fn new(config: RunnerConfig, sink: Rc<dyn ResultSink>) -> Result<Self> {
        let event_loop = EventLoop::new()?;
        Ok(Self::with_event_loop(config, sink, event_loop))
    }

    /// Create a test runner on an existing event loop
    pub fn with_event_loop(
        config: RunnerConfig,
        sink: Rc<dyn ResultSink>,
        event_loop: EventLoop,
    ) -> Self {
        Self {
            bridge: BlockingBridge::new(event_loop.clone()),
            config,
            event_loop,
            sink,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Run a single test case.
    ///
    /// Fails with `Interrupted` when the loop was stopped from outside
    /// while the test was running; the caller should abort the run.
    pub fn run_test(&self, case: TestCase) -> Result<(), EngineError> {
        let id = case.id().to_string();
        let scopes: Vec<Scope> = case
            .scopes()
            .iter()
            .chain(self.config.scopes.iter())
            .cloned()
            .collect();

        let span = test_span(&id);
        let _entered = span.enter();

        self.sink.start_test(&id);
        info!("Running {}", id);

        if let Some(reason) = resolve_skip(&scopes) {
            self.sink.add_skip(&id, &reason);
            self.sink.stop_test(&id);
            return Ok(());
        }

        let timeout = resolve_timeout(&scopes, self.config.default_timeout_secs);
        let todo = resolve_todo(&scopes);
        let timed_out = TimeoutFlag::default();

        let reactor = TestReactor::new(self.event_loop.clone());
        let context = TestContext::new(id.clone(), reactor.clone());
        let runner = PhaseRunner::new(
            self.event_loop.clone(),
            context.clone(),
            timeout,
            Rc::clone(&self.sink),
        )
        .with_todo(todo.clone())
        .with_timeout_flag(timed_out.clone());

        let phases = case.into_phases();
        let sequencer = PhaseSequencer::new(
            context,
            runner,
            Rc::clone(&self.sink),
            todo,
            phases.set_up,
            phases.body,
            phases.tear_down,
        );

        let done = sequencer.start();
        let waited = self.bridge.wait_for(&done, &timed_out);

        let mut leftovers = Vec::new();
        match &waited {
            Ok(Some(_)) => {}
            Ok(None) => warn!("{} timed out before its phases completed", id),
            Err(EngineError::Interrupted) => {
                error!("{} was interrupted", id);
                leftovers.push(Failure::interrupt("test run interrupted"));
                self.sink.stop();
            }
            Err(e) => {
                error!("{} could not be awaited: {}", id, e);
                leftovers.push(Failure::from(*e));
            }
        }

        let pending = reactor.cancel_pending();
        if pending > 0 {
            leftovers.push(Failure::unhandled(format!(
                "Reactor was unclean: {pending} delayed call(s) still pending"
            )));
        }

        sequencer.finish(&leftovers);
        self.sink.stop_test(&id);

        waited.map(|_| ())
    }

    /// Run test cases in order until done or asked to stop.
    ///
    /// Returns true if the run stopped before every case ran.
    pub fn run_all(&self, cases: Vec<TestCase>) -> bool {
        let total = cases.len();
        info!("Starting run of {} test(s)", total);

        for (index, case) in cases.into_iter().enumerate() {
            if self.sink.should_stop() {
                info!("Run stopped after {}/{} test(s)", index, total);
                return true;
            }
            if self.run_test(case).is_err() {
                info!("Run interrupted after {}/{} test(s)", index + 1, total);
                return true;
            }
        }

        false
    }
}

/// Run `cases` against a fresh recording sink and summarize
pub fn run_suite(config: RunnerConfig, cases: Vec<TestCase>) -> Result<RunSummary> {
    let timer = Timer::start("run");
    let sink = Rc::new(RecordingSink::new().with_fail_fast(config.fail_fast));
    let runner = TestRunner::new(config, Rc::clone(&sink) as Rc<dyn ResultSink>)?;

    let total = cases.len();
    let stopped = runner.run_all(cases);

    let summary = sink
        .summary(timer.stop().as_millis() as u64)
        .with_stopped(stopped);
    info!(
        "Run completed: {}/{} test(s) ran, {} passed",
        summary.tests_run, total, summary.passed
    );
    Ok(summary)
}

//! Fixture phase state machine
//!
//! Drives `SettingUp → RunningTest → CleaningUp → TearingDown → Done` for
//! one test. Once the body has run, cleanups and tearDown always follow.
//! Every phase outcome is classified by matching on its failure kind.
//! Once the sequence is finished or superseded by a forced stop, late
//! resolutions of its phases are dropped.

use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

use super::{Chained, Outcome, PendingResult, PhaseRunner};
use crate::case::{Action, TestContext};
use crate::models::{Failure, FailureKind, Todo};
use crate::results::ResultSink;

/// Where a test is in its fixture sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SequenceState {
    SettingUp,
    RunningTest,
    CleaningUp,
    TearingDown,
    Done,
}

impl fmt::Display for SequenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SequenceState::SettingUp => "setting up",
            SequenceState::RunningTest => "running test",
            SequenceState::CleaningUp => "cleaning up",
            SequenceState::TearingDown => "tearing down",
            SequenceState::Done => "done",
        };
        f.write_str(name)
    }
}

/// How a test-body failure is reported
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    ExpectedFailure,
    Failed,
    Interrupted,
    Skipped,
    Errored,
}

/// Classify a test-body failure; a matching todo takes precedence
pub fn classify(failure: &Failure, todo: Option<&Todo>) -> Verdict {
    if todo.is_some_and(|todo| todo.expected(failure)) {
        return Verdict::ExpectedFailure;
    }
    match failure.kind() {
        FailureKind::Assertion => Verdict::Failed,
        FailureKind::Interrupt => Verdict::Interrupted,
        FailureKind::Skip => Verdict::Skipped,
        FailureKind::Timeout
        | FailureKind::AlreadyFired
        | FailureKind::ReentrantWait
        | FailureKind::InvalidTestShape
        | FailureKind::Unhandled => Verdict::Errored,
    }
}

struct SequencerInner {
    id: String,
    runner: PhaseRunner,
    context: TestContext,
    sink: Rc<dyn ResultSink>,
    todo: Option<Todo>,
    set_up: RefCell<Option<Action>>,
    body: RefCell<Option<Action>>,
    tear_down: RefCell<Option<Action>>,
    history: RefCell<Vec<SequenceState>>,
    passed: Cell<bool>,
}

/// Coordinates the fixture phases of one test
#[derive(Clone)]
pub struct PhaseSequencer {
    inner: Rc<SequencerInner>,
}

impl PhaseSequencer {
    pub fn new(
        context: TestContext,
        runner: PhaseRunner,
        sink: Rc<dyn ResultSink>,
        todo: Option<Todo>,
        set_up: Action,
        body: Action,
        tear_down: Action,
    ) -> Self {
        Self {
            inner: Rc::new(SequencerInner {
                id: context.id().to_string(),
                runner,
                context,
                sink,
                todo,
                set_up: RefCell::new(Some(set_up)),
                body: RefCell::new(Some(body)),
                tear_down: RefCell::new(Some(tear_down)),
                history: RefCell::new(Vec::new()),
                passed: Cell::new(false),
            }),
        }
    }

    /// Start the sequence; the result resolves once the last phase is done
    pub fn start(&self) -> PendingResult<()> {
        self.enter(SequenceState::SettingUp);
        let this = self.clone();
        self.run_phase(&self.inner.set_up, "setUp")
            .then(move |outcome| match outcome {
                _ if this.superseded() => Chained::Ready(Ok(())),
                Ok(()) => Chained::Pending(this.run_test()),
                Err(failure) => {
                    this.report_set_up_failure(&failure);
                    Chained::Pending(this.run_cleanups())
                }
            })
    }

    /// Report extra failures found after the sequence, then the success
    /// record if nothing demoted the test.
    pub fn finish(&self, extra_errors: &[Failure]) {
        self.inner.runner.supersede();
        for failure in extra_errors {
            self.inner.sink.add_error(&self.inner.id, failure);
            self.demote();
        }
        self.enter(SequenceState::Done);
        if self.inner.passed.get() {
            self.inner.sink.add_success(&self.inner.id);
        }
    }

    /// Prevent the success record from being emitted
    pub fn demote(&self) {
        self.inner.passed.set(false);
    }

    /// States entered so far, in order
    pub fn history(&self) -> Vec<SequenceState> {
        self.inner.history.borrow().clone()
    }

    pub fn state(&self) -> Option<SequenceState> {
        self.inner.history.borrow().last().copied()
    }

    fn superseded(&self) -> bool {
        if self.inner.runner.is_superseded() {
            debug!("{}: discarding late resolution", self.inner.id);
            return true;
        }
        false
    }

    fn enter(&self, state: SequenceState) {
        debug!("{}: {}", self.inner.id, state);
        self.inner.history.borrow_mut().push(state);
    }

    fn run_phase(&self, slot: &RefCell<Option<Action>>, description: &str) -> PendingResult<()> {
        let action = slot.borrow_mut().take().unwrap_or_default();
        self.inner.runner.run(action, description)
    }

    fn run_test(&self) -> PendingResult<()> {
        self.enter(SequenceState::RunningTest);

        let this = self.clone();
        let body = self
            .run_phase(&self.inner.body, &self.inner.id)
            .map(move |outcome| {
                if !this.superseded() {
                    this.report_body_outcome(outcome);
                }
                Ok(())
            });

        let this = self.clone();
        let cleaned = body.then(move |_| {
            if this.superseded() {
                return Chained::Ready(Ok(()));
            }
            Chained::Pending(this.run_cleanups())
        });

        let this = self.clone();
        cleaned.then(move |_| {
            if this.superseded() {
                return Chained::Ready(Ok(()));
            }
            Chained::Pending(this.run_tear_down())
        })
    }

    fn run_cleanups(&self) -> PendingResult<()> {
        self.enter(SequenceState::CleaningUp);

        let this = self.clone();
        self.inner
            .context
            .cleanups()
            .drain(&self.inner.runner)
            .map(move |outcome| {
                if this.superseded() {
                    return Ok(());
                }
                let failures = outcome.unwrap_or_else(|failure| vec![failure]);
                for failure in &failures {
                    this.inner.sink.add_error(&this.inner.id, failure);
                    this.demote();
                }
                Ok(())
            })
    }

    fn run_tear_down(&self) -> PendingResult<()> {
        self.enter(SequenceState::TearingDown);

        let this = self.clone();
        self.run_phase(&self.inner.tear_down, "tearDown")
            .map(move |outcome| {
                if this.superseded() {
                    return Ok(());
                }
                if let Err(failure) = outcome {
                    this.inner.sink.add_error(&this.inner.id, &failure);
                    if failure.kind() == FailureKind::Interrupt {
                        this.inner.sink.stop();
                    }
                    this.demote();
                }
                Ok(())
            })
    }

    fn report_set_up_failure(&self, failure: &Failure) {
        let sink = &self.inner.sink;
        match failure.kind() {
            FailureKind::Skip => sink.add_skip(&self.inner.id, skip_reason(failure)),
            FailureKind::Interrupt => {
                sink.add_error(&self.inner.id, failure);
                sink.stop();
            }
            _ => sink.add_error(&self.inner.id, failure),
        }
    }

    fn report_body_outcome(&self, outcome: Outcome<()>) {
        let sink = &self.inner.sink;
        let id = &self.inner.id;
        let todo = self.inner.todo.as_ref();

        let failure = match outcome {
            Ok(()) => {
                match todo {
                    Some(todo) => sink.add_unexpected_success(id, todo),
                    None => self.inner.passed.set(true),
                }
                return;
            }
            Err(failure) => failure,
        };

        match (classify(&failure, todo), todo) {
            (Verdict::ExpectedFailure, Some(todo)) => sink.add_expected_failure(id, &failure, todo),
            (Verdict::Failed, _) => sink.add_failure(id, &failure),
            (Verdict::Interrupted, _) => {
                sink.add_error(id, &failure);
                sink.stop();
            }
            (Verdict::Skipped, _) => sink.add_skip(id, skip_reason(&failure)),
            _ => sink.add_error(id, &failure),
        }
    }
}

fn skip_reason(failure: &Failure) -> &str {
    match failure.message() {
        "" => "skipped",
        reason => reason,
    }
}

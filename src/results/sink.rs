//! Result sink interface
//!
//! The engine reports every outcome through [`ResultSink`].
//! [`RecordingSink`] keeps each call as a [`TestRecord`].

use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use tracing::debug;

use crate::models::{Failure, RunSummary, TestOutcome, TestRecord, Todo};

/// Receiver of test outcomes
pub trait ResultSink {
    fn start_test(&self, _test: &str) {}

    fn stop_test(&self, _test: &str) {}

    fn add_success(&self, test: &str);

    fn add_failure(&self, test: &str, failure: &Failure);

    fn add_error(&self, test: &str, failure: &Failure);

    fn add_skip(&self, test: &str, reason: &str);

    fn add_expected_failure(&self, test: &str, failure: &Failure, todo: &Todo);

    fn add_unexpected_success(&self, test: &str, todo: &Todo);

    /// Abort the whole run
    fn stop(&self);

    fn should_stop(&self) -> bool;
}

/// Sink that records every call in order
#[derive(Debug)]
pub struct RecordingSink {
    started_at: DateTime<Utc>,
    records: RefCell<Vec<TestRecord>>,
    tests_run: Cell<usize>,
    stopped: Cell<bool>,
    fail_fast: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            records: RefCell::new(Vec::new()),
            tests_run: Cell::new(0),
            stopped: Cell::new(false),
            fail_fast: false,
        }
    }

    /// Stop the run at the first failure, error or unexpected success
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn records(&self) -> Vec<TestRecord> {
        self.records.borrow().clone()
    }

    pub fn tests_run(&self) -> usize {
        self.tests_run.get()
    }

    /// Outcomes recorded for one test, in order
    pub fn outcomes_for(&self, test: &str) -> Vec<TestOutcome> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.test == test)
            .map(|r| r.outcome)
            .collect()
    }

    pub fn count(&self, outcome: TestOutcome) -> usize {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.outcome == outcome)
            .count()
    }

    pub fn summary(&self, total_duration_ms: u64) -> RunSummary {
        RunSummary::new(
            self.started_at,
            self.tests_run(),
            self.records(),
            total_duration_ms,
        )
        .with_stopped(self.stopped.get())
    }

    fn record(&self, record: TestRecord) {
        debug!("{}", record);
        if self.fail_fast && record.outcome.is_problem() {
            self.stopped.set(true);
        }
        self.records.borrow_mut().push(record);
    }

    fn record_failure(&self, test: &str, outcome: TestOutcome, failure: &Failure) {
        self.record(
            TestRecord::new(test, outcome)
                .with_kind(failure.kind())
                .with_message(failure.message()),
        );
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSink for RecordingSink {
    fn start_test(&self, _test: &str) {
        self.tests_run.set(self.tests_run.get() + 1);
    }

    fn add_success(&self, test: &str) {
        self.record(TestRecord::new(test, TestOutcome::Passed));
    }

    fn add_failure(&self, test: &str, failure: &Failure) {
        self.record_failure(test, TestOutcome::Failed, failure);
    }

    fn add_error(&self, test: &str, failure: &Failure) {
        self.record_failure(test, TestOutcome::Errored, failure);
    }

    fn add_skip(&self, test: &str, reason: &str) {
        self.record(TestRecord::new(test, TestOutcome::Skipped).with_message(reason));
    }

    fn add_expected_failure(&self, test: &str, failure: &Failure, todo: &Todo) {
        self.record(
            TestRecord::new(test, TestOutcome::ExpectedFailure)
                .with_kind(failure.kind())
                .with_message(format!("{} ({})", failure.message(), todo.reason)),
        );
    }

    fn add_unexpected_success(&self, test: &str, todo: &Todo) {
        self.record(
            TestRecord::new(test, TestOutcome::UnexpectedSuccess).with_message(todo.reason.clone()),
        );
    }

    fn stop(&self) {
        self.stopped.set(true);
    }

    fn should_stop(&self) -> bool {
        self.stopped.get()
    }
}

//! Data models for test execution
//!
//! Failures, expected-failure annotations and outcome records.

mod failure;
mod test_result;
mod todo;

pub use failure::{EngineError, Failure, FailureKind};
pub use test_result::{RunSummary, TestOutcome, TestRecord};
pub use todo::Todo;

//! Failure taxonomy
//!
//! Every phase outcome that is not a success is a [`Failure`]: a tagged
//! kind, a human-readable message and an optional chained cause.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Discriminant for every way a phase can end without success
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A test expectation was not met
    Assertion,
    /// The phase voluntarily skipped the test
    Skip,
    /// Abort-everything signal
    Interrupt,
    /// The phase exceeded its deadline
    Timeout,
    /// A result was fired twice
    AlreadyFired,
    /// A blocking wait was started while another was in flight
    ReentrantWait,
    /// The test body can never produce a result
    InvalidTestShape,
    /// Anything else
    Unhandled,
}

impl FailureKind {
    pub fn name(&self) -> &'static str {
        match self {
            FailureKind::Assertion => "AssertionFailure",
            FailureKind::Skip => "SkipSignal",
            FailureKind::Interrupt => "UserInterrupt",
            FailureKind::Timeout => "TimeoutFailure",
            FailureKind::AlreadyFired => "AlreadyFired",
            FailureKind::ReentrantWait => "ReentrantWait",
            FailureKind::InvalidTestShape => "InvalidTestShape",
            FailureKind::Unhandled => "UnhandledFailure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A captured failure of a phase
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    kind: FailureKind,
    message: String,
    #[source]
    cause: Option<Box<Failure>>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Assertion, message)
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Skip, reason)
    }

    pub fn interrupt(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Interrupt, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn unhandled(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unhandled, message)
    }

    /// Chain an underlying failure as the cause of this one
    pub fn with_cause(mut self, cause: Failure) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Failure> {
        self.cause.as_deref()
    }

    /// True if this failure is of one of `kinds`
    pub fn check(&self, kinds: &[FailureKind]) -> bool {
        kinds.contains(&self.kind)
    }
}

/// Errors raised by the engine itself
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("result has already been fired")]
    AlreadyFired,

    #[error("wait is not reentrant")]
    ReentrantWait,

    #[error("event loop stopped before the awaited result resolved")]
    Interrupted,
}

impl From<EngineError> for Failure {
    fn from(err: EngineError) -> Self {
        let kind = match err {
            EngineError::AlreadyFired => FailureKind::AlreadyFired,
            EngineError::ReentrantWait => FailureKind::ReentrantWait,
            EngineError::Interrupted => FailureKind::Interrupt,
        };
        Failure::new(kind, err.to_string())
    }
}

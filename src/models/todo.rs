//! Expected-failure annotations

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Failure, FailureKind};

const DEFAULT_TODO_REASON: &str = "Test expected to fail";

/// Declares that a test is known to fail, optionally only in specific ways
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub reason: String,

    /// Failure kinds this annotation covers; `None` covers every kind
    #[serde(default)]
    pub expected: Option<Vec<FailureKind>>,
}

impl Todo {
    pub fn new(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            reason: if reason.is_empty() {
                DEFAULT_TODO_REASON.to_string()
            } else {
                reason
            },
            expected: None,
        }
    }

    /// Restrict the annotation to the given failure kinds
    pub fn expecting(mut self, kinds: impl IntoIterator<Item = FailureKind>) -> Self {
        self.expected = Some(kinds.into_iter().collect());
        self
    }

    /// Whether `failure` is the failure this annotation anticipates
    pub fn expected(&self, failure: &Failure) -> bool {
        match &self.expected {
            None => true,
            Some(kinds) => failure.check(kinds),
        }
    }
}

impl fmt::Display for Todo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "todo: {}", self.reason)
    }
}

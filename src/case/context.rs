//! Per-test context handed to every action

use std::rc::Rc;

use super::Action;
use crate::executor::CleanupStack;
use crate::reactor::TestReactor;

struct ContextInner {
    id: String,
    cleanups: CleanupStack,
    reactor: TestReactor,
}

/// What a running phase may touch: its id, the cleanup stack and the loop proxy
#[derive(Clone)]
pub struct TestContext {
    inner: Rc<ContextInner>,
}

impl TestContext {
    pub fn new(id: impl Into<String>, reactor: TestReactor) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                id: id.into(),
                cleanups: CleanupStack::new(),
                reactor,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn reactor(&self) -> &TestReactor {
        &self.inner.reactor
    }

    /// Register an action to run after the test body, last registered first
    pub fn add_cleanup(&self, description: impl Into<String>, action: Action) {
        self.inner.cleanups.push(description, action);
    }

    pub(crate) fn cleanups(&self) -> &CleanupStack {
        &self.inner.cleanups
    }
}

//! Test case definitions
//!
//! A [`TestCase`] bundles the fixture phases of one test with the
//! configuration scopes its timeout, todo and skip settings come from.

mod action;
mod assertions;
mod context;

pub use action::Action;
pub use assertions::assert_failure;
pub use context::TestContext;

use serde_json::Value;

use crate::config::{Scope, ScopeLevel};
use crate::models::Todo;

/// One test: setUp, body, tearDown and configuration
#[derive(Debug)]
pub struct TestCase {
    id: String,
    set_up: Action,
    body: Action,
    tear_down: Action,
    scopes: Vec<Scope>,
}

impl TestCase {
    /// Create a test whose body is `body`
    pub fn new(id: impl Into<String>, body: Action) -> Self {
        let id = id.into();
        Self {
            scopes: vec![Scope::new(ScopeLevel::Instance, id.clone())],
            id,
            set_up: Action::noop(),
            body,
            tear_down: Action::noop(),
        }
    }

    pub fn with_set_up(mut self, action: Action) -> Self {
        self.set_up = action;
        self
    }

    pub fn with_tear_down(mut self, action: Action) -> Self {
        self.tear_down = action;
        self
    }

    /// Instance-level timeout in seconds
    pub fn with_timeout(mut self, timeout: impl Into<Value>) -> Self {
        self.instance_scope().timeout = Some(timeout.into());
        self
    }

    /// Instance-level expected-failure annotation
    pub fn with_todo(mut self, todo: Todo) -> Self {
        self.instance_scope().todo = Some(todo);
        self
    }

    /// Instance-level skip; no phase runs
    pub fn with_skip(mut self, reason: impl Into<String>) -> Self {
        self.instance_scope().skip = Some(reason.into());
        self
    }

    /// Add an enclosing scope (class, module, package)
    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self.scopes.sort_by_key(|s| s.level);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Scopes in lookup order, instance first
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub(crate) fn into_phases(self) -> Phases {
        Phases {
            set_up: self.set_up,
            body: self.body,
            tear_down: self.tear_down,
        }
    }

    fn instance_scope(&mut self) -> &mut Scope {
        &mut self.scopes[0]
    }
}

/// The three fixture phases of a test, taken out of the definition
pub(crate) struct Phases {
    pub set_up: Action,
    pub body: Action,
    pub tear_down: Action,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_skip, resolve_timeout, resolve_todo};
    use std::time::Duration;

    #[test]
    fn test_instance_scope_overrides_enclosing_scopes() {
        let case = TestCase::new("test_fetch", Action::noop())
            .in_scope(Scope::new(ScopeLevel::Module, "net").with_timeout(30))
            .in_scope(Scope::new(ScopeLevel::Class, "FetchTests").with_timeout(10))
            .with_timeout(0.25);

        let levels: Vec<_> = case.scopes().iter().map(|s| s.level).collect();
        assert_eq!(
            levels,
            vec![ScopeLevel::Instance, ScopeLevel::Class, ScopeLevel::Module]
        );
        assert_eq!(
            resolve_timeout(case.scopes(), 120.0),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_todo_and_skip_builders() {
        let case = TestCase::new("t", Action::noop())
            .with_todo(Todo::new("broken upstream"))
            .with_skip("disabled");
        assert_eq!(resolve_todo(case.scopes()).unwrap().reason, "broken upstream");
        assert_eq!(resolve_skip(case.scopes()).as_deref(), Some("disabled"));
    }
}

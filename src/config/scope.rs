//! Per-test configuration scopes
//!
//! Timeout, todo and skip settings may be attached to the test instance,
//! its class, its module or its package. Resolution walks the scopes in
//! that order and the first scope carrying the attribute wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::models::Todo;

/// Timeout used when no scope provides a usable value
pub const DEFAULT_TIMEOUT_SECS: f64 = 120.0;

/// Where a scope sits in the lookup order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeLevel {
    Instance,
    Class,
    Module,
    Package,
}

/// Settings attached at one level
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub level: ScopeLevel,

    #[serde(default)]
    pub name: String,

    /// Raw timeout value; validated at resolution time
    #[serde(default)]
    pub timeout: Option<Value>,

    #[serde(default)]
    pub todo: Option<Todo>,

    #[serde(default)]
    pub skip: Option<String>,
}

impl Scope {
    pub fn new(level: ScopeLevel, name: impl Into<String>) -> Self {
        Self {
            level,
            name: name.into(),
            timeout: None,
            todo: None,
            skip: None,
        }
    }

    pub fn with_timeout(mut self, timeout: impl Into<Value>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn with_todo(mut self, todo: Todo) -> Self {
        self.todo = Some(todo);
        self
    }

    pub fn with_skip(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }
}

/// Resolve the per-phase timeout; unusable values fall back to `default_secs`
pub fn resolve_timeout(scopes: &[Scope], default_secs: f64) -> Duration {
    let fallback = seconds(default_secs).unwrap_or_else(|| {
        warn!("Default timeout {default_secs} is not usable, using {DEFAULT_TIMEOUT_SECS}");
        Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)
    });

    let Some((scope, raw)) = scopes
        .iter()
        .find_map(|scope| scope.timeout.as_ref().map(|raw| (scope, raw)))
    else {
        return fallback;
    };

    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed.and_then(seconds) {
        Some(timeout) => timeout,
        None => {
            warn!(
                "'timeout' attribute on {:?} scope '{}' needs to be a number, got {}",
                scope.level, scope.name, raw
            );
            fallback
        }
    }
}

/// First todo annotation found
pub fn resolve_todo(scopes: &[Scope]) -> Option<Todo> {
    scopes.iter().find_map(|scope| scope.todo.clone())
}

/// First skip reason found
pub fn resolve_skip(scopes: &[Scope]) -> Option<String> {
    scopes.iter().find_map(|scope| scope.skip.clone())
}

fn seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

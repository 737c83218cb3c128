//! Phase actions
//!
//! An [`Action`] is the body of a fixture phase, tagged by shape so the
//! phase runner knows how to obtain its outcome.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use super::TestContext;
use crate::executor::{Outcome, PendingResult};
use crate::models::{Failure, FailureKind};
use crate::reactor::panic_message;

type CallFn = Box<dyn FnOnce(&TestContext) -> Outcome<()>>;
type DeferredFn = Box<dyn FnOnce(&TestContext) -> PendingResult<()>>;
type AsyncFn = Box<dyn FnOnce(TestContext) -> LocalBoxFuture<'static, Outcome<()>>>;
type StepsFn = Box<dyn FnOnce(&TestContext) -> Box<dyn Iterator<Item = Outcome<()>>>>;

/// Body of a setUp, test, tearDown or cleanup phase
pub enum Action {
    /// Completes synchronously
    Call(CallFn),
    /// Hands back a result that fires later on the loop
    Deferred(DeferredFn),
    /// A local future driven by the loop
    Async(AsyncFn),
    /// Lazily yields steps; never runs as a phase
    Steps(StepsFn),
}

impl Action {
    pub fn call(f: impl FnOnce(&TestContext) -> Outcome<()> + 'static) -> Self {
        Action::Call(Box::new(f))
    }

    pub fn deferred(f: impl FnOnce(&TestContext) -> PendingResult<()> + 'static) -> Self {
        Action::Deferred(Box::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: FnOnce(TestContext) -> Fut + 'static,
        Fut: Future<Output = Outcome<()>> + 'static,
    {
        Action::Async(Box::new(move |ctx| f(ctx).boxed_local()))
    }

    pub fn steps<F, I>(f: F) -> Self
    where
        F: FnOnce(&TestContext) -> I + 'static,
        I: Iterator<Item = Outcome<()>> + 'static,
    {
        Action::Steps(Box::new(move |ctx| Box::new(f(ctx))))
    }

    /// An action that succeeds immediately
    pub fn noop() -> Self {
        Action::call(|_| Ok(()))
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Action::Call(_) => "call",
            Action::Deferred(_) => "deferred",
            Action::Async(_) => "async",
            Action::Steps(_) => "steps",
        }
    }

    pub fn is_valid_shape(&self) -> bool {
        !matches!(self, Action::Steps(_))
    }

    /// Start the action; panics and invalid shapes become failures
    pub(crate) fn invoke(self, ctx: &TestContext, description: &str) -> PendingResult<()> {
        match self {
            Action::Call(f) => PendingResult::resolved(catch_panic(|| f(ctx)).and_then(|o| o)),
            Action::Deferred(f) => {
                catch_panic(|| f(ctx)).unwrap_or_else(PendingResult::fail)
            }
            Action::Async(f) => match catch_panic(|| f(ctx.clone())) {
                Ok(future) => ctx.reactor().spawn_local(future),
                Err(failure) => PendingResult::fail(failure),
            },
            Action::Steps(_) => PendingResult::fail(Failure::new(
                FailureKind::InvalidTestShape,
                format!("{description} is a generator and therefore will never run"),
            )),
        }
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Action::{}", self.shape())
    }
}

fn catch_panic<R>(f: impl FnOnce() -> R) -> Result<R, Failure> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| Failure::assertion(panic_message(payload.as_ref())))
}

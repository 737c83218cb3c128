//! Single-threaded event loop
//!
//! A tokio current-thread runtime driving a `LocalSet`. Every callback,
//! continuation and timeout runs on the thread that calls [`EventLoop::run`].

use anyhow::{Context, Result};
use futures::FutureExt;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::Notify;
use tokio::task::{JoinHandle, LocalSet};
use tracing::{debug, warn};

use crate::executor::{Outcome, PendingResult};
use crate::models::Failure;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CallStatus {
    Scheduled,
    Called,
    Cancelled,
}

struct CallState {
    id: u64,
    status: Cell<CallStatus>,
    task: RefCell<Option<JoinHandle<()>>>,
}

/// Handle to a callback scheduled with [`EventLoop::call_later`]
#[derive(Clone)]
pub struct DelayedCall {
    state: Rc<CallState>,
}

impl DelayedCall {
    pub fn id(&self) -> u64 {
        self.state.id
    }

    /// True while the callback has neither run nor been cancelled
    pub fn active(&self) -> bool {
        self.state.status.get() == CallStatus::Scheduled
    }

    /// Cancel the callback; returns false if it already ran or was cancelled
    pub fn cancel(&self) -> bool {
        if !self.active() {
            return false;
        }
        self.state.status.set(CallStatus::Cancelled);
        if let Some(task) = self.state.task.borrow_mut().take() {
            task.abort();
        }
        true
    }
}

impl std::fmt::Debug for DelayedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayedCall")
            .field("id", &self.state.id)
            .field("status", &self.state.status.get())
            .finish()
    }
}

struct LoopInner {
    // Dropped before the runtime so pending local tasks go down with it alive
    local: LocalSet,
    runtime: Runtime,
    wakeup: Notify,
    running: Cell<bool>,
    stop_requested: Cell<bool>,
    crashed: Cell<bool>,
    next_call_id: Cell<u64>,
}

/// Cooperative event loop with delayed calls and a run/stop/crash surface
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<LoopInner>,
}

impl EventLoop {
    /// Create a new event loop bound to the current thread
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build event loop runtime")?;

        Ok(Self {
            inner: Rc::new(LoopInner {
                local: LocalSet::new(),
                runtime,
                wakeup: Notify::new(),
                running: Cell::new(false),
                stop_requested: Cell::new(false),
                crashed: Cell::new(false),
                next_call_id: Cell::new(0),
            }),
        })
    }

    /// Schedule `callback` to run after `delay`
    pub fn call_later(&self, delay: Duration, callback: impl FnOnce() + 'static) -> DelayedCall {
        let id = self.inner.next_call_id.get();
        self.inner.next_call_id.set(id + 1);

        let call = DelayedCall {
            state: Rc::new(CallState {
                id,
                status: Cell::new(CallStatus::Scheduled),
                task: RefCell::new(None),
            }),
        };

        let fired = call.clone();
        let task = self.inner.local.spawn_local(async move {
            tokio::time::sleep(delay).await;
            if fired.active() {
                fired.state.status.set(CallStatus::Called);
                fired.state.task.borrow_mut().take();
                callback();
            }
        });
        *call.state.task.borrow_mut() = Some(task);

        debug!("Scheduled delayed call {} in {:?}", id, delay);
        call
    }

    /// Run blocking work off the loop; its result is delivered back on the loop
    pub fn defer_to_thread<T, F>(&self, work: F) -> PendingResult<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> Outcome<T> + Send + 'static,
    {
        let result = PendingResult::new();
        let target = result.clone();
        self.inner.local.spawn_local(async move {
            let outcome = match tokio::task::spawn_blocking(work).await {
                Ok(outcome) => outcome,
                Err(e) => Err(Failure::unhandled(format!("Worker thread failed: {e}"))),
            };
            if target.fire(outcome).is_err() {
                debug!("Worker result arrived after its result was superseded");
            }
        });
        result
    }

    /// Run a local future on the loop and expose it as a pending result
    pub fn spawn_local<T, F>(&self, future: F) -> PendingResult<T>
    where
        T: Clone + 'static,
        F: Future<Output = Outcome<T>> + 'static,
    {
        let result = PendingResult::new();
        let target = result.clone();
        self.inner.local.spawn_local(async move {
            let outcome = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(payload) => Err(Failure::assertion(panic_message(payload.as_ref()))),
            };
            if target.fire(outcome).is_err() {
                debug!("Future completed after its result was superseded");
            }
        });
        result
    }

    /// Drive the loop until `stop` or `crash` is requested
    pub fn run(&self) {
        if self.inner.running.replace(true) {
            warn!("Event loop is already running");
            return;
        }
        self.inner.crashed.set(false);

        let inner = Rc::clone(&self.inner);
        let until_stopped = async move {
            loop {
                let notified = inner.wakeup.notified();
                if inner.stop_requested.replace(false) {
                    break;
                }
                notified.await;
            }
        };
        self.inner
            .runtime
            .block_on(self.inner.local.run_until(until_stopped));

        self.inner.running.set(false);
    }

    /// Ask a running loop to return from `run`
    pub fn stop(&self) {
        if !self.request_exit() {
            debug!("Ignoring stop request: event loop is not running");
        }
    }

    /// Force a running loop to return from `run` immediately
    pub fn crash(&self) {
        if self.request_exit() {
            self.inner.crashed.set(true);
        } else {
            debug!("Ignoring crash request: event loop is not running");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// True if the last run ended through `crash`
    pub fn was_crashed(&self) -> bool {
        self.inner.crashed.get()
    }

    fn request_exit(&self) -> bool {
        if !self.inner.running.get() {
            return false;
        }
        self.inner.stop_requested.set(true);
        self.inner.wakeup.notify_waiters();
        true
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_later_runs_in_deadline_order() {
        let event_loop = EventLoop::new().unwrap();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (tag, millis) in [("slow", 30u64), ("fast", 5)] {
            let order = order.clone();
            event_loop.call_later(Duration::from_millis(millis), move || {
                order.borrow_mut().push(tag)
            });
        }
        let stopper = event_loop.clone();
        event_loop.call_later(Duration::from_millis(60), move || stopper.stop());

        event_loop.run();
        assert_eq!(*order.borrow(), vec!["fast", "slow"]);
        assert!(!event_loop.was_crashed());
    }

    #[test]
    fn test_cancelled_call_never_runs() {
        let event_loop = EventLoop::new().unwrap();
        let ran = Rc::new(Cell::new(false));

        let flag = ran.clone();
        let call = event_loop.call_later(Duration::from_millis(5), move || flag.set(true));
        assert!(call.active());
        assert!(call.cancel());
        assert!(!call.cancel());

        let stopper = event_loop.clone();
        event_loop.call_later(Duration::from_millis(20), move || stopper.crash());
        event_loop.run();

        assert!(!ran.get());
        assert!(!call.active());
        assert!(event_loop.was_crashed());
    }

    #[test]
    fn test_stop_outside_run_is_ignored() {
        let event_loop = EventLoop::new().unwrap();
        event_loop.stop();

        let ran = Rc::new(Cell::new(false));
        let (flag, stopper) = (ran.clone(), event_loop.clone());
        event_loop.call_later(Duration::from_millis(5), move || {
            flag.set(true);
            stopper.stop();
        });
        event_loop.run();
        assert!(ran.get());
    }

    #[test]
    fn test_defer_to_thread_delivers_on_loop() {
        let event_loop = EventLoop::new().unwrap();
        let result = event_loop.defer_to_thread(|| Ok(21 * 2));

        let stopper = event_loop.clone();
        result.on_complete(move |_| stopper.stop());
        event_loop.run();

        assert_eq!(result.outcome(), Some(Ok(42)));
    }

    #[test]
    fn test_spawn_local_converts_panic_to_failure() {
        let event_loop = EventLoop::new().unwrap();
        let result: PendingResult<()> = event_loop.spawn_local(async {
            tokio::task::yield_now().await;
            panic!("expected 1, got 2");
        });

        let stopper = event_loop.clone();
        result.on_complete(move |_| stopper.stop());
        event_loop.run();

        let failure = result.outcome().unwrap().unwrap_err();
        assert_eq!(failure.message(), "expected 1, got 2");
    }
}

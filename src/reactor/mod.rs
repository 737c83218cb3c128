//! Event loop and the proxy tests use to reach it

mod event_loop;
mod proxy;

pub use event_loop::{DelayedCall, EventLoop};
pub use proxy::TestReactor;

pub(crate) use event_loop::panic_message;

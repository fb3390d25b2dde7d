//! Request interception, host polling and deferred replay.
//!
//! A foreground computation acquires a [`PollScope`] on a host. While the
//! scope lives, new foreground requests are captured instead of executed and
//! the computation periodically lets the host loop run a bounded number of
//! iterations. When the scope ends, the original handler is restored and the
//! captured requests are replayed in arrival order on the host loop.

pub mod bridge;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod lifecycle;
pub mod pump;
pub mod registry;
pub mod replay;
pub mod scope;
pub mod sequence;

pub use bridge::BlockingPoller;
pub use context::ContextGuard;
pub use error::PollError;
pub use interceptor::Interceptor;
pub use lifecycle::FinishReason;
pub use pump::Pump;
pub use replay::{Replay, ReplayPolicy, ReplayReport};
pub use scope::PollScope;
pub use sequence::{
    poll_until, poll_until_async, try_poll_until, with_polling, with_polling_blocking, PollingIter,
};

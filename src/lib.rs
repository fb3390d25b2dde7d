pub mod config;
pub mod host;
pub mod poll;

pub use config::{Config, PollOptions};
pub use host::{Host, HostError, PendingRequest, RequestHandler, SharedHost, TaskIdentity};
pub use poll::{
    poll_until, poll_until_async, try_poll_until, with_polling, with_polling_blocking,
    BlockingPoller, PollError, PollScope, ReplayPolicy,
};

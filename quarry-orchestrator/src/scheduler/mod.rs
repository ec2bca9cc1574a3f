//! Poll scheduling
//!
//! A submitted run is driven to a terminal state by repeated poll
//! invocations. Each invocation is self-contained: everything it needs is in
//! its [`PollTask`] and the run store, and the only way it continues is by
//! handing its successor to a [`DelayQueue`].

mod poller;
mod queue;
mod worker;

pub use poller::{PollError, PollOutcome, PollSettings, PollTask, RunPoller};
pub use queue::{DelayQueue, TokioDelayQueue};
pub use worker::PollWorker;

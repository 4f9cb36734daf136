//! Bounded polling and retry primitives shared by the workflow executors.
//!
//! Both executors converge on the same shape of work: keep probing some
//! external state (or keep re-running some fallible call) on a fixed cadence
//! until it settles or the invocation's deadline elapses. The deadline is the
//! single cancellation source; a slow collaborator can never stall timeout
//! detection because every probe runs on its own task.

mod poll;
mod retry;

pub use poll::{Done, TimedOut, poll};
pub use retry::retry;

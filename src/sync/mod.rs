//! The sync module provides the CPU-side threading utilities used to record work in parallel.
//!
//! - The [`task`] module defines [`Task`](task::Task), a boxed unit of work, and [`TaskCompletionCallback`](task::TaskCompletionCallback),
//! a counter that runs a continuation once a batch of tasks finished.
//! - The [`task_scheduler`] module provides a fixed-size thread pool with fire-and-forget submission and a blocking
//! fork/join call.

pub mod task;
pub mod task_scheduler;

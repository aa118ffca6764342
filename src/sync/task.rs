//! Units of work for the [`TaskScheduler`](crate::sync::task_scheduler::TaskScheduler).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

type TaskFn = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work executed exactly once by a worker thread.
///
/// A task may be linked to a [`TaskCompletionCallback`]. After the task ran, the callback's counter is decremented,
/// and the worker that brings it to zero runs the callback's completion task right away.
pub struct Task {
    function: TaskFn,
    completion: Option<Arc<TaskCompletionCallback>>,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}

impl Task {
    /// Create a new task. Everything the task needs must be moved into the closure.
    pub fn new(function: impl FnOnce() + Send + 'static) -> Self {
        Self {
            function: Box::new(function),
            completion: None,
        }
    }

    /// Create a task that ticks down `callback` once it finished.
    pub fn with_completion(function: impl FnOnce() + Send + 'static, callback: Arc<TaskCompletionCallback>) -> Self {
        Self {
            function: Box::new(function),
            completion: Some(callback),
        }
    }

    /// Link this task to a completion callback, replacing any previous one.
    pub fn set_completion(&mut self, callback: Arc<TaskCompletionCallback>) {
        self.completion = Some(callback);
    }

    /// Run the task. Returns the completion task to run next if this was the last task its callback was waiting on.
    ///
    /// A panic inside the task is caught and logged, and still counts as the task having finished.
    pub(crate) fn run(self) -> Option<Task> {
        if catch_unwind(AssertUnwindSafe(self.function)).is_err() {
            error!("Task panicked on thread {:?}", std::thread::current().name());
        }
        self.completion.and_then(|callback| callback.complete_one())
    }

    /// Run this task and every completion task it chains into on the current thread.
    pub(crate) fn execute(self) {
        let mut next = Some(self);
        while let Some(task) = next {
            next = task.run();
        }
    }
}

/// Runs a completion task once a fixed number of other tasks finished.
///
/// Create one for a batch of `N` tasks with a count of `N`, and link every task in the batch to it.
/// The counter reaches zero exactly once, and the completion task runs exactly once, on whichever worker
/// finished the last task.
pub struct TaskCompletionCallback {
    completion: Mutex<Option<Task>>,
    remaining: AtomicU32,
}

impl std::fmt::Debug for TaskCompletionCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskCompletionCallback")
            .field("remaining", &self.remaining())
            .finish()
    }
}

impl TaskCompletionCallback {
    /// Create a callback that runs `completion` after `count` linked tasks finished.
    pub fn new(completion: Task, count: u32) -> Arc<Self> {
        Arc::new(Self {
            completion: Mutex::new(Some(completion)),
            remaining: AtomicU32::new(count),
        })
    }

    /// Amount of linked tasks that still have to finish.
    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::Acquire)
    }

    /// Tick the counter down by one. Returns the completion task if the counter reached zero.
    fn complete_one(&self) -> Option<Task> {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1));
        match previous {
            Ok(1) => match self.completion.lock() {
                Ok(mut completion) => completion.take(),
                Err(poisoned) => poisoned.into_inner().take(),
            },
            Ok(_) => None,
            Err(_) => {
                error!("Task completion callback ticked down more often than it has tasks");
                None
            }
        }
    }
}

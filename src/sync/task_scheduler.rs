//! Exposes the [`TaskScheduler`], a fixed-size worker pool draining a shared FIFO task queue.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use anyhow::Result;
use static_assertions::assert_impl_all;

use crate::sync::task::{Task, TaskCompletionCallback};
use crate::Error;

/// Lifecycle of a [`TaskScheduler`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    /// Workers are accepting and executing tasks.
    Running,
    /// Shutdown was requested, workers are being joined.
    ShuttingDown,
    /// Every worker thread has been joined.
    Stopped,
}

#[derive(Debug, Default)]
struct TaskQueue {
    tasks: VecDeque<Task>,
    shutting_down: bool,
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<TaskQueue>,
    condition: Condvar,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, TaskQueue>> {
        Ok(self.queue.lock().map_err(|_| Error::PoisonError)?)
    }
}

/// A fixed pool of worker threads executing [`Task`]s in submission order.
///
/// Tasks are popped from a single FIFO queue. Multiple workers drain it concurrently, so there is no ordering
/// guarantee between the execution of different tasks. Use [`TaskScheduler::add_task_list_and_wait`] to fork a batch of
/// work and block until all of it finished.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use deimos::prelude::*;
///
/// # fn main() -> anyhow::Result<()> {
/// let scheduler = TaskScheduler::new(4)?;
/// let recorded = Arc::new(AtomicU32::new(0));
/// let tasks = (0..8).map(|_| {
///     let recorded = recorded.clone();
///     Task::new(move || { recorded.fetch_add(1, Ordering::Relaxed); })
/// }).collect::<Vec<_>>();
/// scheduler.add_task_list_and_wait(tasks)?;
/// assert_eq!(recorded.load(Ordering::Relaxed), 8);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TaskScheduler {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    state: SchedulerState,
}

assert_impl_all!(TaskScheduler: Send, Sync);
assert_impl_all!(Task: Send);

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let Ok(queue) = shared.queue.lock() else {
                error!("Task queue mutex poisoned, worker exiting");
                return;
            };
            let Ok(mut queue) = shared
                .condition
                .wait_while(queue, |queue| queue.tasks.is_empty() && !queue.shutting_down)
            else {
                error!("Task queue mutex poisoned, worker exiting");
                return;
            };

            if queue.shutting_down {
                break;
            }

            match queue.tasks.pop_front() {
                Some(task) => task,
                None => continue,
            }
        };

        task.execute();
    }
}

impl TaskScheduler {
    /// Spawn `pool_size` worker threads.
    /// # Errors
    /// - Fails if `pool_size` is zero.
    /// - Fails with [`Error::ThreadSpawn`] if a worker thread could not be spawned. Workers spawned so far are joined.
    pub fn new(pool_size: usize) -> Result<Self> {
        if pool_size == 0 {
            return Err(Error::Uncategorized("Task scheduler needs at least one worker thread").into());
        }

        let mut scheduler = Self {
            shared: Arc::new(Shared::default()),
            workers: Vec::with_capacity(pool_size),
            state: SchedulerState::Running,
        };

        for index in 0..pool_size {
            let shared = scheduler.shared.clone();
            let worker = std::thread::Builder::new()
                .name(format!("deimos-worker-{index}"))
                .spawn(move || worker_loop(shared))
                .map_err(Error::ThreadSpawn)?;
            scheduler.workers.push(worker);
        }

        info!("Task scheduler started with {pool_size} worker threads");
        Ok(scheduler)
    }

    /// Queue a single task and wake up one worker.
    /// # Errors
    /// Fails with [`Error::SchedulerStopped`] if the scheduler is shutting down.
    pub fn add_task(&self, task: Task) -> Result<()> {
        let mut queue = self.shared.lock()?;
        if queue.shutting_down {
            return Err(Error::SchedulerStopped.into());
        }
        queue.tasks.push_back(task);
        self.shared.condition.notify_one();
        Ok(())
    }

    /// Queue a batch of tasks at once and wake up every worker.
    /// # Errors
    /// Fails with [`Error::SchedulerStopped`] if the scheduler is shutting down. No task of the batch is queued in that case.
    pub fn add_task_list(&self, tasks: impl IntoIterator<Item = Task>) -> Result<()> {
        let mut queue = self.shared.lock()?;
        if queue.shutting_down {
            return Err(Error::SchedulerStopped.into());
        }
        queue.tasks.extend(tasks);
        self.shared.condition.notify_all();
        Ok(())
    }

    /// Queue a batch of tasks and block until every one of them finished.
    ///
    /// Every task in the batch is linked to one shared [`TaskCompletionCallback`], replacing any callback it had.
    /// An empty batch returns immediately.
    ///
    /// Do not call this from inside a task with a pool this small that every worker could end up waiting, as that deadlocks.
    /// # Errors
    /// Fails with [`Error::SchedulerStopped`] if the scheduler is shutting down.
    pub fn add_task_list_and_wait(&self, tasks: Vec<Task>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let count = u32::try_from(tasks.len()).map_err(|_| Error::Uncategorized("Task batch too large"))?;
        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let done = signal.clone();
        let callback = TaskCompletionCallback::new(
            Task::new(move || {
                let (finished, condition) = &*done;
                *finished.lock().unwrap_or_else(PoisonError::into_inner) = true;
                condition.notify_all();
            }),
            count,
        );

        self.add_task_list(tasks.into_iter().map(|mut task| {
            task.set_completion(callback.clone());
            task
        }))?;

        let (finished, condition) = &*signal;
        let finished = finished.lock().map_err(|_| Error::PoisonError)?;
        let _finished = condition
            .wait_while(finished, |finished| !*finished)
            .map_err(|_| Error::PoisonError)?;
        Ok(())
    }

    /// Stop every worker thread and wait for them to exit. Tasks that are currently running finish normally,
    /// tasks still in the queue are dropped without running. Calling this more than once does nothing.
    pub fn shutdown(&mut self) {
        if self.state == SchedulerState::Stopped {
            return;
        }

        self.state = SchedulerState::ShuttingDown;
        {
            let mut queue = self.shared.queue.lock().unwrap_or_else(PoisonError::into_inner);
            queue.shutting_down = true;
            self.shared.condition.notify_all();
        }

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("Worker thread panicked");
            }
        }

        let abandoned = {
            let mut queue = self.shared.queue.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut queue.tasks)
        };
        if !abandoned.is_empty() {
            warn!("Task scheduler shut down with {} queued tasks that never ran", abandoned.len());
        }
        drop(abandoned);

        self.state = SchedulerState::Stopped;
        info!("Task scheduler stopped");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Number of worker threads that have not been joined.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of tasks waiting in the queue. Tasks already picked up by a worker are not counted.
    /// # Errors
    /// - Fails with [`Error::PoisonError`] if the queue lock is poisoned.
    pub fn pending_tasks(&self) -> Result<usize> {
        Ok(self.shared.lock()?.tasks.len())
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

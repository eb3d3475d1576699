//! Bounded execution of task batches on a shared worker pool.
//!
//! A batch is a `Vec` of tasks. [`TaskRunner::run`] starts at most `concurrency`
//! workers on the pool; each worker pulls the next unstarted task only after its
//! previous one finished, so admission is bounded without a semaphore. The calling
//! thread blocks until the batch is done, which makes `run` a full barrier: every
//! write a task made is visible to the caller afterwards.
//!
//! Failure policy: the first failing task (error or panic) wins a single-assignment
//! slot. Workers stop pulling new tasks, running tasks see
//! [`StopSignal::should_stop`] flip and wind down, and the winning error is returned.
//! Later failures are logged and dropped.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, OnceLock},
};

use super::{Concurrency, TerminationFlag};
use crate::tracing_helpers::{debug_log, warn_log};

/// A fixed-size pool of worker threads, shared by reference across runs.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Creates a pool with `threads` worker threads.
    ///
    /// # Errors
    /// Returns the builder error if the threads cannot be spawned.
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("superstep-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    /// Creates a pool sized to the available hardware parallelism.
    ///
    /// # Errors
    /// Returns the builder error if the threads cannot be spawned.
    pub fn with_available_parallelism() -> Result<Self, rayon::ThreadPoolBuildError> {
        Self::new(Concurrency::available().get())
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl core::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}

/// What a task polls to learn that it should return early.
#[derive(Debug)]
pub struct StopSignal {
    termination: TerminationFlag,
    failed: Arc<AtomicBool>,
}

impl StopSignal {
    /// Returns `true` once the run was cancelled or another task failed.
    #[inline]
    pub fn should_stop(&self) -> bool {
        self.failed.load(Ordering::Acquire) || self.termination.is_terminated()
    }

    /// Returns `true` once the caller's termination flag was raised.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.termination.is_terminated()
    }
}

/// A unit of work executed by the [`TaskRunner`].
///
/// Tasks poll `stop` at reasonable granularity (once per node) and return `Ok(())`
/// early when it is raised; cancellation is not an error.
pub trait Task: Send {
    /// The failure type of the task.
    type Error: Send + Sync;

    /// Runs the task to completion.
    ///
    /// # Errors
    /// Any error aborts the whole batch; the first one is returned by
    /// [`TaskRunner::run`].
    fn run(self, stop: &StopSignal) -> Result<(), Self::Error>;
}

impl<F, E> Task for F
where
    F: FnOnce(&StopSignal) -> Result<(), E> + Send,
    E: Send + Sync,
{
    type Error = E;

    #[inline]
    fn run(self, stop: &StopSignal) -> Result<(), E> {
        self(stop)
    }
}

/// The first failure of a batch.
#[derive(Debug, thiserror::Error)]
pub enum TaskError<E> {
    /// The task returned an error.
    #[error("task {task} failed: {error}")]
    Failed {
        /// Position of the task in the batch.
        task: usize,
        /// The error the task returned.
        error: E,
    },
    /// The task panicked.
    #[error("task {task} panicked: {message}")]
    Panicked {
        /// Position of the task in the batch.
        task: usize,
        /// The panic payload, if it was a string.
        message: String,
    },
}

impl<E> TaskError<E> {
    /// Position of the failing task in its batch.
    pub fn task(&self) -> usize {
        match self {
            Self::Failed { task, .. } | Self::Panicked { task, .. } => *task,
        }
    }
}

/// How a batch ended when no task failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunCompletion {
    /// Every task ran to completion.
    Finished,
    /// The termination flag was raised; some tasks may have stopped early or not run.
    Cancelled,
}

/// Runs task batches on a [`WorkerPool`] with bounded concurrency.
#[derive(Debug)]
pub struct TaskRunner<'pool> {
    pool: &'pool WorkerPool,
    concurrency: Concurrency,
    termination: TerminationFlag,
}

impl<'pool> TaskRunner<'pool> {
    /// Creates a runner that keeps at most `concurrency` tasks in flight.
    pub fn new(pool: &'pool WorkerPool, concurrency: Concurrency, termination: TerminationFlag) -> Self {
        Self {
            pool,
            concurrency,
            termination,
        }
    }

    /// The concurrency bound.
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// The termination flag shared with the tasks.
    pub fn termination(&self) -> &TerminationFlag {
        &self.termination
    }

    /// Runs `tasks` and blocks until all of them finished or the batch aborted.
    ///
    /// # Errors
    /// Returns the first task failure. Tasks that had not started when it happened
    /// are never run.
    pub fn run<T: Task>(&self, tasks: Vec<T>) -> Result<RunCompletion, TaskError<T::Error>> {
        let total = tasks.len();
        if total == 0 {
            return Ok(self.completion());
        }

        // One slot per task; each is taken exactly once by whichever worker claims
        // its index, so the mutexes are never contended.
        let slots: Vec<Mutex<Option<T>>> = tasks.into_iter().map(|t| Mutex::new(Some(t))).collect();
        let next = AtomicUsize::new(0);
        let first_error: OnceLock<TaskError<T::Error>> = OnceLock::new();
        let stop = StopSignal {
            termination: self.termination.clone(),
            failed: Arc::new(AtomicBool::new(false)),
        };
        let workers = self.concurrency.get().min(total);
        debug_log!(tasks = total, workers, "running task batch");

        self.pool.pool.in_place_scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| {
                    while !stop.should_stop() {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        if index >= total {
                            break;
                        }
                        let task = match slots[index].lock() {
                            Ok(mut slot) => slot.take(),
                            Err(poisoned) => poisoned.into_inner().take(),
                        };
                        let Some(task) = task else { continue };

                        let failure = match panic::catch_unwind(AssertUnwindSafe(|| task.run(&stop))) {
                            Ok(Ok(())) => None,
                            Ok(Err(error)) => Some(TaskError::Failed { task: index, error }),
                            Err(payload) => Some(TaskError::Panicked {
                                task: index,
                                message: panic_message(payload.as_ref()),
                            }),
                        };
                        if let Some(failure) = failure {
                            stop.failed.store(true, Ordering::Release);
                            if let Err(discarded) = first_error.set(failure) {
                                warn_log!(task = discarded.task(), "discarding secondary task failure");
                                drop(discarded);
                            }
                        }
                    }
                });
            }
        });

        match first_error.into_inner() {
            Some(error) => Err(error),
            None => Ok(self.completion()),
        }
    }

    fn completion(&self) -> RunCompletion {
        if self.termination.is_terminated() {
            RunCompletion::Cancelled
        } else {
            RunCompletion::Finished
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

//! Concurrency substrate: partitioning, bounded task execution, cancellation,
//! progress reporting, atomic flags and the relaxation primitive.
//!
//! All parallelism is data parallelism over disjoint node partitions. Every wait is
//! a thread blocking on the completion of a task batch.

use core::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

pub mod atomic;
pub mod partition;
pub mod progress;
pub mod relax;
pub mod runner;
pub mod termination;

pub use atomic::AtomicBitSet;
pub use partition::{
    aligned_range_partition, degree_partition, degree_partition_graph, range_partition,
    DegreePartition, Partition,
};
pub use progress::{NoProgress, ProgressCounter, ProgressSink};
pub use relax::{DistanceTracker, Exchange, RelaxOutcome, SignBitGuard, SignBitLock};
pub use runner::{RunCompletion, StopSignal, Task, TaskError, TaskRunner, WorkerPool};
pub use termination::TerminationFlag;

/// Upper bound on simultaneously running tasks. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Concurrency(NonZeroUsize);

impl Concurrency {
    /// A single worker.
    pub const SINGLE: Self = Self(NonZeroUsize::MIN);

    /// Returns `None` if `n == 0`.
    pub const fn new(n: usize) -> Option<Self> {
        match NonZeroUsize::new(n) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// The hardware parallelism reported by the OS, or 1 if unknown.
    pub fn available() -> Self {
        Self(std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
    }

    /// The bound as a plain integer.
    #[inline]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::available()
    }
}

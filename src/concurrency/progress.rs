//! Fire-and-forget progress reporting.

use core::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

use crate::tracing_helpers::debug_log;

/// Receives progress notifications from running tasks.
///
/// Implementations must be cheap and must never block or fail: the engine calls
/// this from worker threads after every partition.
pub trait ProgressSink: Sync {
    /// Records that `amount` more units of work were completed.
    fn log_progress(&self, amount: u64);
}

/// A sink that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    #[inline]
    fn log_progress(&self, _amount: u64) {}
}

/// A sink that counts completed work and logs every tenth of `volume` at debug
/// level.
#[derive(Debug)]
pub struct ProgressCounter {
    task: String,
    volume: u64,
    done: CachePadded<AtomicU64>,
}

impl ProgressCounter {
    /// Creates a counter for `volume` units of work of the named task.
    pub fn new(task: impl Into<String>, volume: u64) -> Self {
        Self {
            task: task.into(),
            volume,
            done: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Units of work completed so far.
    pub fn completed(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    /// Resets the counter, e.g. at the start of a new superstep.
    pub fn reset(&self) {
        self.done.store(0, Ordering::Relaxed);
    }

    /// Name of the tracked task.
    pub fn task(&self) -> &str {
        &self.task
    }
}

impl ProgressSink for ProgressCounter {
    fn log_progress(&self, amount: u64) {
        let before = self.done.fetch_add(amount, Ordering::Relaxed);
        if self.volume == 0 {
            return;
        }
        let step = (self.volume / 10).max(1);
        let after = before + amount;
        if before / step != after / step {
            let percent = after.min(self.volume) * 100 / self.volume;
            debug_log!(task = %self.task, percent, "progress");
        }
    }
}

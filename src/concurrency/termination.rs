//! Cooperative cancellation.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

/// A shared "please stop" flag.
///
/// Cloning is cheap and every clone observes the same flag. Long-running loops poll
/// [`is_running`](Self::is_running) at node granularity and return early once it
/// flips; nothing is ever interrupted forcibly.
#[derive(Clone, Default)]
pub struct TerminationFlag {
    terminated: Arc<CachePadded<AtomicBool>>,
}

impl TerminationFlag {
    /// Creates a flag in the running state.
    pub fn running() -> Self {
        Self::default()
    }

    /// Requests termination. Idempotent.
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
    }

    /// Returns `true` until [`terminate`](Self::terminate) was called on any clone.
    #[inline]
    pub fn is_running(&self) -> bool {
        !self.is_terminated()
    }

    /// Returns `true` once termination was requested.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

impl core::fmt::Debug for TerminationFlag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TerminationFlag")
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

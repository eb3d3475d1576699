//! Concurrent (distance, predecessor, hop count) relaxation.
//!
//! The hop count slot doubles as the per-node lock, so all three fields change
//! together while each node costs exactly three machine words.

use crossbeam_utils::Backoff;

use super::sign_lock::SignBitLock;
use crate::collections::paged::AtomicPagedArray;

/// Predecessor of nodes that were never reached (and of the source).
pub const NO_PREDECESSOR: u64 = u64::MAX;

/// Outcome of [`DistanceTracker::try_relax`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelaxOutcome {
    /// The new distance was stored; `previous` is the distance it replaced.
    Improved {
        /// Distance before the update.
        previous: f64,
    },
    /// The stored distance was already at least as good.
    NotImproved {
        /// Distance currently stored.
        current: f64,
    },
    /// Another thread held the node; nothing was read or written.
    Contended,
}

/// Outcome of [`DistanceTracker::compare_and_exchange`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exchange {
    /// The stored distance equaled `expected` and was replaced; carries it.
    Success(f64),
    /// The stored distance differed from `expected`; carries the witness.
    Failed(f64),
    /// Another thread held the node.
    Contended,
}

/// Per-node tentative distances for concurrent shortest-path style algorithms.
#[derive(Debug)]
pub struct DistanceTracker {
    distances: AtomicPagedArray<f64>,
    predecessors: AtomicPagedArray<u64>,
    lengths: SignBitLock,
}

impl DistanceTracker {
    /// Creates a tracker where every node is unreached: distance `+inf`, no
    /// predecessor, hop count `i64::MAX`.
    pub fn new(node_count: u64) -> Self {
        Self {
            distances: AtomicPagedArray::filled(node_count, f64::INFINITY),
            predecessors: AtomicPagedArray::filled(node_count, NO_PREDECESSOR),
            lengths: SignBitLock::new(node_count, i64::MAX),
        }
    }

    /// Number of tracked nodes.
    pub fn node_count(&self) -> u64 {
        self.distances.size()
    }

    /// Marks `node` as a source: distance `0`, hop count `0`.
    ///
    /// Spins while another thread holds the node.
    pub fn set_source(&self, node: u64) {
        let backoff = Backoff::new();
        loop {
            if let Ok(guard) = self.lengths.try_lock(node) {
                self.distances.set(node, 0.0);
                self.predecessors.set(node, NO_PREDECESSOR);
                guard.unlock_with(0);
                return;
            }
            backoff.snooze();
        }
    }

    /// Current distance of `node`.
    #[inline]
    pub fn distance(&self, node: u64) -> f64 {
        self.distances.get(node)
    }

    /// Current predecessor of `node`, if it has one.
    #[inline]
    pub fn predecessor(&self, node: u64) -> Option<u64> {
        let p = self.predecessors.get(node);
        (p != NO_PREDECESSOR).then_some(p)
    }

    /// Current hop count of `node`, or `None` while it is being updated.
    #[inline]
    pub fn length(&self, node: u64) -> Option<i64> {
        self.lengths.load(node)
    }

    /// All distances.
    pub fn distances(&self) -> &AtomicPagedArray<f64> {
        &self.distances
    }

    /// Attempts to lower the distance of `node` to `new_distance` once.
    ///
    /// Never spins: if the node is locked the call reports
    /// [`RelaxOutcome::Contended`] and the caller decides whether to retry.
    ///
    /// # Panics
    /// Panics if `new_length < 0`.
    pub fn try_relax(&self, node: u64, new_distance: f64, predecessor: u64, new_length: i64) -> RelaxOutcome {
        assert_length(new_length);
        let Ok(guard) = self.lengths.try_lock(node) else {
            return RelaxOutcome::Contended;
        };
        let current = self.distances.get(node);
        if current <= new_distance {
            guard.unlock();
            return RelaxOutcome::NotImproved { current };
        }
        self.distances.set(node, new_distance);
        self.predecessors.set(node, predecessor);
        guard.unlock_with(new_length);
        RelaxOutcome::Improved { previous: current }
    }

    /// Replaces the distance of `node` with `new_distance` iff it currently equals
    /// `expected` (bitwise).
    ///
    /// # Panics
    /// Panics if `new_length < 0`.
    pub fn compare_and_exchange(
        &self,
        node: u64,
        expected: f64,
        new_distance: f64,
        predecessor: u64,
        new_length: i64,
    ) -> Exchange {
        assert_length(new_length);
        let Ok(guard) = self.lengths.try_lock(node) else {
            return Exchange::Contended;
        };
        let current = self.distances.get(node);
        if current.to_bits() != expected.to_bits() {
            guard.unlock();
            return Exchange::Failed(current);
        }
        self.distances.set(node, new_distance);
        self.predecessors.set(node, predecessor);
        guard.unlock_with(new_length);
        Exchange::Success(current)
    }

    /// Lowers the distance of `node` to `new_distance` if that is an improvement,
    /// retrying with backoff while the node is contended.
    ///
    /// Returns `true` iff this call stored the new distance.
    pub fn relax(&self, node: u64, new_distance: f64, predecessor: u64, new_length: i64) -> bool {
        let backoff = Backoff::new();
        loop {
            match self.try_relax(node, new_distance, predecessor, new_length) {
                RelaxOutcome::Improved { .. } => return true,
                RelaxOutcome::NotImproved { .. } => return false,
                RelaxOutcome::Contended => backoff.snooze(),
            }
        }
    }

    /// Follows predecessors from `target` back to its source.
    ///
    /// Returns the path source-first, or `None` if `target` was never reached.
    /// Must only be called once relaxation has finished.
    pub fn path_to(&self, target: u64) -> Option<Vec<u64>> {
        if self.distance(target).is_infinite() {
            return None;
        }
        let mut path = vec![target];
        let mut node = target;
        while let Some(p) = self.predecessor(node) {
            path.push(p);
            node = p;
            if path.len() as u64 > self.node_count() {
                // A cycle in the predecessor chain means relaxation has not settled.
                return None;
            }
        }
        path.reverse();
        Some(path)
    }
}

// Checked before locking so a rejected length leaves all three fields untouched.
#[inline]
#[track_caller]
fn assert_length(length: i64) {
    assert!(length >= 0, "hop count must be non-negative, got {length}");
}

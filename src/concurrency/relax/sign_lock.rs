//! Per-element locks hidden in the sign bit of a non-negative `i64`.
//!
//! A slot holds a meaningful value `v >= 0` while unlocked and `!v` (that is
//! `-v - 1`, always negative) while locked. Using `!v` rather than `-v` keeps `0`
//! lockable: it locks to `-1`. The encoding never leaves this module; callers see
//! [`SignBitLock::try_lock`] and a guard.

use crate::collections::paged::AtomicPagedArray;

/// Returned when a lock attempt lost against another thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contended;

impl core::fmt::Display for Contended {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("slot is locked by another thread")
    }
}

/// A paged array of non-negative `i64` values, each usable as its own lock.
#[derive(Debug)]
pub struct SignBitLock {
    slots: AtomicPagedArray<i64>,
}

impl SignBitLock {
    /// Creates `size` unlocked slots holding `initial`.
    ///
    /// # Panics
    /// Panics if `initial < 0`.
    pub fn new(size: u64, initial: i64) -> Self {
        assert!(initial >= 0, "sign-bit locked values must be non-negative");
        Self {
            slots: AtomicPagedArray::filled(size, initial),
        }
    }

    /// Number of slots.
    pub fn size(&self) -> u64 {
        self.slots.size()
    }

    /// Returns the value at `index`, or `None` while another thread holds the lock.
    #[inline]
    pub fn load(&self, index: u64) -> Option<i64> {
        let raw = self.slots.get(index);
        (raw >= 0).then_some(raw)
    }

    /// Returns `true` while the slot is locked.
    #[inline]
    pub fn is_locked(&self, index: u64) -> bool {
        self.slots.get(index) < 0
    }

    /// Tries to lock slot `index` without spinning.
    ///
    /// # Errors
    /// Returns [`Contended`] if the slot is already locked or another thread locked
    /// it between our read and our compare-and-exchange.
    #[inline]
    pub fn try_lock(&self, index: u64) -> Result<SignBitGuard<'_>, Contended> {
        let current = self.slots.get(index);
        if current < 0 {
            return Err(Contended);
        }
        let witness = self.slots.compare_and_exchange(index, current, !current);
        if witness != current {
            return Err(Contended);
        }
        Ok(SignBitGuard {
            lock: self,
            index,
            value: current,
            armed: true,
        })
    }
}

/// Exclusive access to one slot of a [`SignBitLock`].
///
/// Dropping the guard restores the value it was locked with.
#[must_use = "dropping the guard unlocks immediately"]
pub struct SignBitGuard<'a> {
    lock: &'a SignBitLock,
    index: u64,
    value: i64,
    armed: bool,
}

impl SignBitGuard<'_> {
    /// The value the slot held when it was locked.
    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }

    /// The locked index.
    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Unlocks, restoring the previous value.
    #[inline]
    pub fn unlock(self) {
        drop(self);
    }

    /// Unlocks, publishing `value`.
    ///
    /// Writes made to other memory while holding the guard are visible to the next
    /// thread that locks this slot.
    ///
    /// # Panics
    /// Panics if `value < 0`.
    #[inline]
    pub fn unlock_with(mut self, value: i64) {
        assert!(value >= 0, "sign-bit locked values must be non-negative");
        self.armed = false;
        self.lock.slots.set(self.index, value);
    }
}

impl Drop for SignBitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.lock.slots.set(self.index, self.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_lockable() {
        let lock = SignBitLock::new(2, 0);
        let guard = lock.try_lock(1).unwrap();
        assert!(lock.is_locked(1));
        assert_eq!(lock.load(1), None);
        assert_eq!(lock.try_lock(1).err(), Some(Contended));
        assert_eq!(guard.value(), 0);
        guard.unlock();
        assert_eq!(lock.load(1), Some(0));
    }

    #[test]
    fn unlock_with_publishes() {
        let lock = SignBitLock::new(1, i64::MAX);
        lock.try_lock(0).unwrap().unlock_with(7);
        assert_eq!(lock.load(0), Some(7));
    }
}

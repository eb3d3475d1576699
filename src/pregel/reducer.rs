//! Message reducers: combine every message sent to a node within one superstep
//! into a single value as it arrives.
//!
//! `reduce` runs inside a compare-and-exchange retry loop and may be evaluated more
//! than once per message, so it must be pure. It must also be commutative and
//! associative: messages arrive in no particular order.

use num_traits::{Bounded, One, Zero};

use crate::collections::paged::AtomicValue;

/// Combines messages addressed to the same node.
pub trait Reducer<M>: Send + Sync {
    /// The value a mailbox holds before any message arrived.
    fn identity(&self) -> M;

    /// Folds `message` into the mailbox value `current`.
    fn reduce(&self, current: M, message: M) -> M;
}

/// Sums messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

/// Keeps the smallest message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Min;

/// Keeps the largest message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

/// Counts messages, ignoring their values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count;

impl<M: AtomicValue + Zero> Reducer<M> for Sum {
    fn identity(&self) -> M {
        M::zero()
    }

    fn reduce(&self, current: M, message: M) -> M {
        current + message
    }
}

impl<M: AtomicValue + Bounded + PartialOrd> Reducer<M> for Min {
    fn identity(&self) -> M {
        M::max_value()
    }

    fn reduce(&self, current: M, message: M) -> M {
        if message < current {
            message
        } else {
            current
        }
    }
}

impl<M: AtomicValue + Bounded + PartialOrd> Reducer<M> for Max {
    fn identity(&self) -> M {
        M::min_value()
    }

    fn reduce(&self, current: M, message: M) -> M {
        if message > current {
            message
        } else {
            current
        }
    }
}

impl<M: AtomicValue + Zero + One> Reducer<M> for Count {
    fn identity(&self) -> M {
        M::zero()
    }

    fn reduce(&self, current: M, _message: M) -> M {
        current + M::one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold<R: Reducer<f64>>(r: &R, xs: &[f64]) -> f64 {
        xs.iter().fold(r.identity(), |acc, &x| r.reduce(acc, x))
    }

    #[test]
    fn builtins() {
        let xs = [3.0, -1.0, 7.5];
        assert_eq!(fold(&Sum, &xs), 9.5);
        assert_eq!(fold(&Min, &xs), -1.0);
        assert_eq!(fold(&Max, &xs), 7.5);
        assert_eq!(fold(&Count, &xs), 3.0);
    }
}

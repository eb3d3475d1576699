//! Element types storable in an [`AtomicPagedArray`](super::AtomicPagedArray).
//!
//! Every element type maps onto a hardware atomic of the same width. Floating-point
//! values are stored by their bit pattern, so compare-and-exchange on floats compares
//! bits: `0.0` and `-0.0` are different values, and a NaN only matches itself.

use core::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};

/// A `Copy` value with a lock-free atomic representation.
pub trait AtomicValue: Copy + Default + PartialEq + Send + Sync + core::fmt::Debug + 'static {
    /// The atomic cell holding one element.
    type Atom: Send + Sync;

    /// Bit pattern written over released pages in debug builds.
    const POISON: Self;

    /// Creates a new atomic cell holding `value`.
    fn new_atom(value: Self) -> Self::Atom;

    /// Atomically loads the value.
    fn load(atom: &Self::Atom, order: Ordering) -> Self;

    /// Atomically stores `value`.
    fn store(atom: &Self::Atom, value: Self, order: Ordering);

    /// Stores `new` if the cell currently holds `current`.
    ///
    /// Returns `Ok(previous)` on success and `Err(witness)` on failure.
    fn compare_exchange(
        atom: &Self::Atom,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;

    /// Like [`compare_exchange`](Self::compare_exchange) but may fail spuriously.
    fn compare_exchange_weak(
        atom: &Self::Atom,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
}

macro_rules! impl_atomic_int {
    ($($t:ty => $atom:ty, $poison:expr);* $(;)?) => {
        $(
            impl AtomicValue for $t {
                type Atom = $atom;

                const POISON: Self = $poison;

                #[inline(always)]
                fn new_atom(value: Self) -> Self::Atom {
                    <$atom>::new(value)
                }

                #[inline(always)]
                fn load(atom: &Self::Atom, order: Ordering) -> Self {
                    atom.load(order)
                }

                #[inline(always)]
                fn store(atom: &Self::Atom, value: Self, order: Ordering) {
                    atom.store(value, order);
                }

                #[inline(always)]
                fn compare_exchange(
                    atom: &Self::Atom,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    atom.compare_exchange(current, new, success, failure)
                }

                #[inline(always)]
                fn compare_exchange_weak(
                    atom: &Self::Atom,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    atom.compare_exchange_weak(current, new, success, failure)
                }
            }
        )*
    };
}

impl_atomic_int!(
    i32 => AtomicI32, i32::from_ne_bytes([0xA5; 4]);
    u32 => AtomicU32, 0xA5A5_A5A5;
    i64 => AtomicI64, i64::from_ne_bytes([0xA5; 8]);
    u64 => AtomicU64, 0xA5A5_A5A5_A5A5_A5A5;
);

macro_rules! impl_atomic_float {
    ($($t:ty => $atom:ty, $poison:expr);* $(;)?) => {
        $(
            impl AtomicValue for $t {
                type Atom = $atom;

                const POISON: Self = $poison;

                #[inline(always)]
                fn new_atom(value: Self) -> Self::Atom {
                    <$atom>::new(value.to_bits())
                }

                #[inline(always)]
                fn load(atom: &Self::Atom, order: Ordering) -> Self {
                    <$t>::from_bits(atom.load(order))
                }

                #[inline(always)]
                fn store(atom: &Self::Atom, value: Self, order: Ordering) {
                    atom.store(value.to_bits(), order);
                }

                #[inline(always)]
                fn compare_exchange(
                    atom: &Self::Atom,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    atom.compare_exchange(current.to_bits(), new.to_bits(), success, failure)
                        .map(<$t>::from_bits)
                        .map_err(<$t>::from_bits)
                }

                #[inline(always)]
                fn compare_exchange_weak(
                    atom: &Self::Atom,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    atom.compare_exchange_weak(current.to_bits(), new.to_bits(), success, failure)
                        .map(<$t>::from_bits)
                        .map_err(<$t>::from_bits)
                }
            }
        )*
    };
}

impl_atomic_float!(f32 => AtomicU32, f32::NAN; f64 => AtomicU64, f64::NAN);

//! Lock-free atomic building blocks shared by the engine.
//!
//! Element-level atomics live in [`AtomicPagedArray`](crate::collections::paged::AtomicPagedArray);
//! this module adds the bit-packed flag storage built on top of it.

/// Word-packed atomic bitsets.
pub mod bitset;

pub use bitset::AtomicBitSet;

//! `u64`-indexed storage for per-node and per-relationship data.

pub mod paged;

pub use paged::{
    memory_estimation, AtomicPagedArray, AtomicValue, PagedArray, PagedArrayError,
    DEFAULT_PAGE_SHIFT, MAX_PAGE_SHIFT,
};

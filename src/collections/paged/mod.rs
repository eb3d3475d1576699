//! Paged arrays: huge logical arrays backed by fixed-size, lazily appended pages.
//!
//! Goals:
//! - index space of `u64` (far beyond what a single allocation should hold)
//! - no monolithic allocation: storage is a directory of equally sized pages
//! - growth appends pages; element storage never moves once allocated
//! - branch-free addressing: page size is a power of two, so
//!   `page = index >> shift` and `offset = index & mask`
//!
//! Two flavors share the same geometry:
//! - [`PagedArray`]: plain elements, mutated only through `&mut self`
//! - [`AtomicPagedArray`]: atomic elements, mutated concurrently through `&self`

pub mod atomic;
pub mod plain;
pub mod value;

pub use atomic::AtomicPagedArray;
pub use plain::{PageCursor, PagedArray};
pub use value::AtomicValue;

/// Default page shift: `1 << 12` elements per page (32 KiB for 8-byte elements).
pub const DEFAULT_PAGE_SHIFT: u32 = 12;

/// Largest supported page shift.
pub const MAX_PAGE_SHIFT: u32 = 30;

/// Error returned by the fallible accessors of the paged arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PagedArrayError {
    /// The index lies outside `[0, size)`.
    #[error("index {index} out of bounds for paged array of size {size}")]
    IndexOutOfBounds {
        /// The rejected index.
        index: u64,
        /// The logical size at the time of access.
        size: u64,
    },
    /// The array was released and can no longer be used.
    #[error("paged array was released")]
    Released,
}

/// Page geometry shared by both array flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageLayout {
    shift: u32,
    mask: u64,
}

impl PageLayout {
    pub(crate) fn new(shift: u32) -> Self {
        assert!(
            shift <= MAX_PAGE_SHIFT,
            "page shift {shift} exceeds maximum {MAX_PAGE_SHIFT}"
        );
        Self {
            shift,
            mask: (1u64 << shift) - 1,
        }
    }

    #[inline(always)]
    pub(crate) fn shift(self) -> u32 {
        self.shift
    }

    #[inline(always)]
    pub(crate) fn page_size(self) -> usize {
        1usize << self.shift
    }

    #[inline(always)]
    pub(crate) fn page_index(self, index: u64) -> usize {
        (index >> self.shift) as usize
    }

    #[inline(always)]
    pub(crate) fn index_in_page(self, index: u64) -> usize {
        (index & self.mask) as usize
    }

    /// Number of pages needed to hold `size` elements.
    #[inline]
    pub(crate) fn pages_for(self, size: u64) -> usize {
        (size.div_ceil(1u64 << self.shift)) as usize
    }
}

/// Estimated heap footprint, in bytes, of a paged array with `size` elements of
/// `elem_bytes` bytes each. Pages are always allocated at full size.
pub fn memory_estimation(size: u64, page_shift: u32, elem_bytes: usize) -> usize {
    let layout = PageLayout::new(page_shift);
    let pages = layout.pages_for(size);
    let directory = pages * core::mem::size_of::<Box<[u8]>>();
    directory + pages.saturating_mul(layout.page_size()).saturating_mul(elem_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_splits_indices_on_page_edges() {
        let layout = PageLayout::new(2);
        assert_eq!(layout.page_size(), 4);
        assert_eq!((layout.page_index(3), layout.index_in_page(3)), (0, 3));
        assert_eq!((layout.page_index(4), layout.index_in_page(4)), (1, 0));
        assert_eq!(layout.pages_for(0), 0);
        assert_eq!(layout.pages_for(4), 1);
        assert_eq!(layout.pages_for(5), 2);
    }

    #[test]
    fn memory_estimation_grows_with_size() {
        let small = memory_estimation(1_000, DEFAULT_PAGE_SHIFT, 8);
        let large = memory_estimation(1_000_000, DEFAULT_PAGE_SHIFT, 8);
        assert!(small >= 8_000);
        assert!(large > small);
    }
}

//! `PagedArray`: plain (non-atomic) paged storage.
//!
//! Mutation requires `&mut self`, so a plain array is either worker-private scratch
//! space or is written during a single-threaded setup phase and then shared
//! read-only. Concurrent writers use [`AtomicPagedArray`](super::AtomicPagedArray).

use core::{fmt, ops::Range};

use super::{AtomicValue, PageLayout, PagedArrayError, DEFAULT_PAGE_SHIFT};

/// A huge array of `Copy` elements split into fixed-size pages.
#[derive(Clone)]
pub struct PagedArray<T> {
    pages: Vec<Box<[T]>>,
    size: u64,
    layout: PageLayout,
    released: bool,
}

impl<T: Copy + Default> PagedArray<T> {
    /// Creates an array of `size` default elements with the default page size.
    pub fn new(size: u64) -> Self {
        Self::with_page_shift(size, DEFAULT_PAGE_SHIFT)
    }

    /// Creates an array of `size` default elements with `1 << page_shift` elements
    /// per page.
    ///
    /// # Panics
    /// Panics if `page_shift` exceeds [`MAX_PAGE_SHIFT`](super::MAX_PAGE_SHIFT).
    pub fn with_page_shift(size: u64, page_shift: u32) -> Self {
        let layout = PageLayout::new(page_shift);
        let pages = (0..layout.pages_for(size))
            .map(|_| new_page::<T>(layout))
            .collect();
        Self {
            pages,
            size,
            layout,
            released: false,
        }
    }

    /// Creates an array of `size` copies of `value`.
    pub fn filled(size: u64, value: T) -> Self {
        let mut array = Self::new(size);
        array.fill(value);
        array
    }

    /// Creates an array whose element `i` is `f(i)`.
    pub fn from_fn(size: u64, f: impl FnMut(u64) -> T) -> Self {
        let mut array = Self::new(size);
        array.set_all(f);
        array
    }

    /// Grows the logical size to at least `new_size`.
    ///
    /// Only pages are appended; elements already stored stay where they are. New
    /// slots hold `T::default()`.
    ///
    /// # Panics
    /// Panics if the array was released.
    pub fn ensure_capacity(&mut self, new_size: u64) {
        assert!(!self.released, "{}", PagedArrayError::Released);
        if new_size <= self.size {
            return;
        }
        // Slots past the old size in the last page become visible: reset them.
        let allocated = (self.pages.len() as u64) << self.layout.shift();
        for index in self.size..new_size.min(allocated) {
            let (page, offset) = (self.layout.page_index(index), self.layout.index_in_page(index));
            self.pages[page][offset] = T::default();
        }
        let needed = self.layout.pages_for(new_size);
        while self.pages.len() < needed {
            self.pages.push(new_page::<T>(self.layout));
        }
        self.size = new_size;
    }

    /// Writes `value` into every slot `i < size`.
    pub fn fill(&mut self, value: T) {
        self.set_all(|_| value);
    }

    /// Writes `f(i)` into every slot `i < size`.
    pub fn set_all(&mut self, mut f: impl FnMut(u64) -> T) {
        let size = self.size;
        let page_size = self.layout.page_size() as u64;
        for (p, page) in self.pages.iter_mut().enumerate() {
            let base = p as u64 * page_size;
            for (offset, slot) in page.iter_mut().enumerate() {
                let index = base + offset as u64;
                if index >= size {
                    break;
                }
                *slot = f(index);
            }
        }
    }
}

impl<T: Copy> PagedArray<T> {
    /// Logical number of elements.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns `true` if the array holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Log2 of the page size.
    pub fn page_shift(&self) -> u32 {
        self.layout.shift()
    }

    /// Elements per page.
    pub fn page_size(&self) -> usize {
        self.layout.page_size()
    }

    /// Number of allocated pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` once [`release`](Self::release) was called.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Returns element `index`.
    ///
    /// # Panics
    /// Panics if `index >= size()` or the array was released.
    #[inline]
    #[track_caller]
    pub fn get(&self, index: u64) -> T {
        match self.try_get(index) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }

    /// Returns element `index`, or an error if it is out of range.
    #[inline]
    pub fn try_get(&self, index: u64) -> Result<T, PagedArrayError> {
        self.check(index)?;
        Ok(self.pages[self.layout.page_index(index)][self.layout.index_in_page(index)])
    }

    /// Stores `value` at `index`.
    ///
    /// # Panics
    /// Panics if `index >= size()` or the array was released.
    #[inline]
    #[track_caller]
    pub fn set(&mut self, index: u64, value: T) {
        if let Err(e) = self.try_set(index, value) {
            panic!("{e}");
        }
    }

    /// Stores `value` at `index`, or returns an error if it is out of range.
    #[inline]
    pub fn try_set(&mut self, index: u64, value: T) -> Result<(), PagedArrayError> {
        self.check(index)?;
        let (page, offset) = (self.layout.page_index(index), self.layout.index_in_page(index));
        self.pages[page][offset] = value;
        Ok(())
    }

    /// Iterates the pages covering `[0, size)` as `(first_index, slice)` pairs.
    pub fn pages(&self) -> PageCursor<'_, T> {
        self.cursor(0..self.size)
    }

    /// Iterates the page slices covering `range`, clipped to `[0, size)`.
    pub fn cursor(&self, range: Range<u64>) -> PageCursor<'_, T> {
        let end = range.end.min(self.size);
        PageCursor {
            array: self,
            next: range.start.min(end),
            end,
        }
    }

    /// Iterates all elements in index order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.pages().flat_map(|(_, page)| page.iter().copied())
    }

    /// Copies the elements into a `Vec`.
    ///
    /// Intended for small arrays (results, tests); the whole array must fit into
    /// one allocation.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    #[inline(always)]
    fn check(&self, index: u64) -> Result<(), PagedArrayError> {
        if self.released {
            return Err(PagedArrayError::Released);
        }
        if index >= self.size {
            return Err(PagedArrayError::IndexOutOfBounds {
                index,
                size: self.size,
            });
        }
        Ok(())
    }
}

impl<T: AtomicValue> PagedArray<T> {
    /// Frees every page and returns the number of bytes released.
    ///
    /// Every later access fails with [`PagedArrayError::Released`]. Debug builds
    /// overwrite the pages with [`AtomicValue::POISON`] before freeing them.
    pub fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }
        let freed = self.pages.len() * self.layout.page_size() * core::mem::size_of::<T>();
        #[cfg(debug_assertions)]
        self.poison();
        self.pages = Vec::new();
        self.size = 0;
        self.released = true;
        freed
    }

    #[cfg(debug_assertions)]
    fn poison(&mut self) {
        for page in &mut self.pages {
            page.fill(T::POISON);
        }
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for PagedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedArray")
            .field("size", &self.size)
            .field("page_size", &self.layout.page_size())
            .field("pages", &self.pages.len())
            .field("released", &self.released)
            .finish()
    }
}

/// Cursor over the page slices of a [`PagedArray`].
///
/// Yields `(first_index, slice)` where `slice[i]` is element `first_index + i`.
pub struct PageCursor<'a, T> {
    array: &'a PagedArray<T>,
    next: u64,
    end: u64,
}

impl<'a, T: Copy> Iterator for PageCursor<'a, T> {
    type Item = (u64, &'a [T]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let layout = self.array.layout;
        let page = layout.page_index(self.next);
        let offset = layout.index_in_page(self.next);
        let page_end = ((page as u64 + 1) << layout.shift()).min(self.end);
        let len = (page_end - self.next) as usize;
        let start = self.next;
        self.next = page_end;
        Some((start, &self.array.pages[page][offset..offset + len]))
    }
}

fn new_page<T: Copy + Default>(layout: PageLayout) -> Box<[T]> {
    vec![T::default(); layout.page_size()].into_boxed_slice()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_across_page_edge() {
        let mut a: PagedArray<u64> = PagedArray::with_page_shift(10, 2);
        assert_eq!(a.page_count(), 3);
        a.set(3, 33);
        a.set(4, 44);
        assert_eq!(a.get(3), 33);
        assert_eq!(a.get(4), 44);
        assert_eq!(a.get(5), 0);
    }

    #[test]
    fn cursor_clips_to_range() {
        let mut a = PagedArray::<u32>::with_page_shift(10, 2);
        a.set_all(|i| i as u32);
        let pages: Vec<(u64, Vec<u32>)> = a.cursor(3..9).map(|(s, p)| (s, p.to_vec())).collect();
        assert_eq!(
            pages,
            vec![(3, vec![3]), (4, vec![4, 5, 6, 7]), (8, vec![8])]
        );
    }

    #[test]
    fn released_array_rejects_access() {
        let mut a = PagedArray::<i64>::new(5);
        assert!(a.release() > 0);
        assert_eq!(a.try_get(0), Err(PagedArrayError::Released));
        assert_eq!(a.release(), 0);
    }

    #[test]
    fn growth_after_fill_exposes_defaults() {
        let mut a = PagedArray::<u64>::filled(5, 7);
        a.ensure_capacity(10);
        assert_eq!(a.to_vec(), vec![7, 7, 7, 7, 7, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn growth_resets_tail_of_last_page() {
        let mut a = PagedArray::<u64>::with_page_shift(4, 3);
        a.pages[0].fill(9);
        a.ensure_capacity(6);
        assert_eq!(a.to_vec(), vec![9, 9, 9, 9, 0, 0]);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn poison_covers_every_allocated_slot() {
        let mut a = PagedArray::<u64>::with_page_shift(5, 2);
        a.set_all(|i| i);
        a.poison();
        assert!(a.pages.iter().flat_map(|p| p.iter()).all(|&v| v == u64::POISON));
        assert!(a.release() > 0);
        assert!(a.is_released());
    }
}

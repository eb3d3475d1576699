//! `AtomicPagedArray`: paged storage whose slots are hardware atomics.
//!
//! Any worker may read or write any index concurrently through `&self`; safety comes
//! from the atomicity of each element operation, not from exclusion. Multi-slot
//! consistency is the caller's business (see [`SignBitLock`](crate::concurrency::relax::SignBitLock)).

use core::{fmt, sync::atomic::Ordering};

use crossbeam_utils::Backoff;
use num_traits::Num;

use super::{AtomicValue, PageLayout, PagedArray, PagedArrayError, DEFAULT_PAGE_SHIFT};

/// A huge array of atomic elements split into fixed-size pages.
pub struct AtomicPagedArray<T: AtomicValue> {
    pages: Vec<Box<[T::Atom]>>,
    size: u64,
    layout: PageLayout,
    released: bool,
}

impl<T: AtomicValue> AtomicPagedArray<T> {
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
            .map(|_| new_page::<T>(layout, T::default()))
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
        let array = Self::new(size);
        array.fill(value);
        array
    }

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

    /// Atomically loads element `index`.
    ///
    /// # Panics
    /// Panics if `index >= size()` or the array was released.
    #[inline]
    #[track_caller]
    pub fn get(&self, index: u64) -> T {
        T::load(self.slot(index), Ordering::Acquire)
    }

    /// Atomically loads element `index`, or returns an error if it is out of range.
    #[inline]
    pub fn try_get(&self, index: u64) -> Result<T, PagedArrayError> {
        Ok(T::load(self.try_slot(index)?, Ordering::Acquire))
    }

    /// Atomically stores `value` at `index`.
    ///
    /// # Panics
    /// Panics if `index >= size()` or the array was released.
    #[inline]
    #[track_caller]
    pub fn set(&self, index: u64, value: T) {
        T::store(self.slot(index), value, Ordering::Release);
    }

    /// Atomically stores `value` at `index`, or returns an error if it is out of range.
    #[inline]
    pub fn try_set(&self, index: u64, value: T) -> Result<(), PagedArrayError> {
        T::store(self.try_slot(index)?, value, Ordering::Release);
        Ok(())
    }

    /// Stores `update` at `index` if the slot holds `expect`; returns whether it did.
    #[inline]
    #[track_caller]
    pub fn compare_and_set(&self, index: u64, expect: T, update: T) -> bool {
        T::compare_exchange(self.slot(index), expect, update, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Stores `update` at `index` if the slot holds `expect`.
    ///
    /// Returns the witness: the value present at the time of the attempt. The
    /// exchange happened iff the witness equals `expect` (bitwise for floats).
    #[inline]
    #[track_caller]
    pub fn compare_and_exchange(&self, index: u64, expect: T, update: T) -> T {
        match T::compare_exchange(self.slot(index), expect, update, Ordering::AcqRel, Ordering::Acquire) {
            Ok(previous) => previous,
            Err(witness) => witness,
        }
    }

    /// Replaces element `index` with `f(current)` and returns the new value.
    ///
    /// Retries until no other writer intervened between the read and the write, so
    /// `f` may run several times and must be free of side effects.
    #[inline]
    #[track_caller]
    pub fn update(&self, index: u64, f: impl Fn(T) -> T) -> T {
        self.fetch_update(index, f).1
    }

    /// Like [`update`](Self::update) but returns the value that was replaced.
    #[inline]
    #[track_caller]
    pub fn get_and_update(&self, index: u64, f: impl Fn(T) -> T) -> T {
        self.fetch_update(index, f).0
    }

    /// Sets every slot `i < size` to `value`.
    ///
    /// Stores are individually atomic; the fill as a whole is not.
    pub fn fill(&self, value: T) {
        self.set_all(|_| value);
    }

    /// Stores `f(i)` into every slot `i < size`.
    pub fn set_all(&self, f: impl Fn(u64) -> T) {
        let page_size = self.layout.page_size() as u64;
        for (p, page) in self.pages.iter().enumerate() {
            let base = p as u64 * page_size;
            for (offset, slot) in page.iter().enumerate() {
                let index = base + offset as u64;
                if index >= self.size {
                    return;
                }
                T::store(slot, f(index), Ordering::Relaxed);
            }
        }
    }

    /// Grows the logical size to at least `new_size` by appending pages.
    ///
    /// New slots hold `T::default()`.
    ///
    /// # Panics
    /// Panics if the array was released.
    pub fn ensure_capacity(&mut self, new_size: u64) {
        assert!(!self.released, "{}", PagedArrayError::Released);
        if new_size <= self.size {
            return;
        }
        let allocated = (self.pages.len() as u64) << self.layout.shift();
        for index in self.size..new_size.min(allocated) {
            let (page, offset) = (self.layout.page_index(index), self.layout.index_in_page(index));
            T::store(&self.pages[page][offset], T::default(), Ordering::Relaxed);
        }
        let needed = self.layout.pages_for(new_size);
        while self.pages.len() < needed {
            self.pages.push(new_page::<T>(self.layout, T::default()));
        }
        self.size = new_size;
    }

    /// Frees every page and returns the number of bytes released.
    ///
    /// Debug builds overwrite the pages with [`AtomicValue::POISON`] first.
    pub fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }
        let freed = self.pages.len() * self.layout.page_size() * core::mem::size_of::<T::Atom>();
        #[cfg(debug_assertions)]
        self.poison();
        self.pages = Vec::new();
        self.size = 0;
        self.released = true;
        freed
    }

    /// Iterates all elements in index order, loading each one atomically.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.size).map(move |i| self.get(i))
    }

    /// Copies the current contents into a plain [`PagedArray`] with the same geometry.
    pub fn to_paged(&self) -> PagedArray<T> {
        let mut out = PagedArray::with_page_shift(self.size, self.layout.shift());
        out.set_all(|i| self.get(i));
        out
    }

    /// Copies the current contents into a `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    #[cfg(debug_assertions)]
    fn poison(&mut self) {
        for slot in self.pages.iter().flat_map(|page| page.iter()) {
            T::store(slot, T::POISON, Ordering::Relaxed);
        }
    }

    /// CAS loop shared by `update` and the numeric helpers: returns `(old, new)`.
    #[inline]
    #[track_caller]
    fn fetch_update(&self, index: u64, f: impl Fn(T) -> T) -> (T, T) {
        let slot = self.slot(index);
        let backoff = Backoff::new();
        let mut current = T::load(slot, Ordering::Acquire);
        loop {
            let next = f(current);
            match T::compare_exchange_weak(slot, current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return (current, next),
                Err(witness) => {
                    current = witness;
                    backoff.spin();
                }
            }
        }
    }

    #[inline(always)]
    #[track_caller]
    fn slot(&self, index: u64) -> &T::Atom {
        match self.try_slot(index) {
            Ok(slot) => slot,
            Err(e) => panic!("{e}"),
        }
    }

    #[inline(always)]
    fn try_slot(&self, index: u64) -> Result<&T::Atom, PagedArrayError> {
        if self.released {
            return Err(PagedArrayError::Released);
        }
        if index >= self.size {
            return Err(PagedArrayError::IndexOutOfBounds {
                index,
                size: self.size,
            });
        }
        Ok(&self.pages[self.layout.page_index(index)][self.layout.index_in_page(index)])
    }
}

impl<T: AtomicValue + Num> AtomicPagedArray<T> {
    /// Adds `delta` to element `index` and returns the previous value.
    #[inline]
    #[track_caller]
    pub fn get_and_add(&self, index: u64, delta: T) -> T {
        self.fetch_update(index, |v| v + delta).0
    }

    /// Adds `delta` to element `index` and returns the new value.
    #[inline]
    #[track_caller]
    pub fn add_and_get(&self, index: u64, delta: T) -> T {
        self.fetch_update(index, |v| v + delta).1
    }
}

impl<T: AtomicValue> fmt::Debug for AtomicPagedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicPagedArray")
            .field("size", &self.size)
            .field("page_size", &self.layout.page_size())
            .field("pages", &self.pages.len())
            .field("released", &self.released)
            .finish()
    }
}

fn new_page<T: AtomicValue>(layout: PageLayout, value: T) -> Box<[T::Atom]> {
    (0..layout.page_size()).map(|_| T::new_atom(value)).collect()
}

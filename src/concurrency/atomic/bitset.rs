//! Word-packed atomic bitsets over paged storage.
//!
//! Dense alternative to one `AtomicBool` per node: vote-to-halt bits, "has message"
//! flags, visited sets.

use crate::collections::paged::AtomicPagedArray;

const WORD_BITS: u64 = u64::BITS as u64;

/// A word-packed atomic bitset addressed by `u64` bit indices.
#[derive(Debug)]
pub struct AtomicBitSet {
    bits: u64,
    words: AtomicPagedArray<u64>,
}

impl AtomicBitSet {
    /// Creates a bitset with `bits` bits, all cleared.
    pub fn new(bits: u64) -> Self {
        Self {
            bits,
            words: AtomicPagedArray::new(bits.div_ceil(WORD_BITS)),
        }
    }

    /// Number of bits.
    pub fn len(&self) -> u64 {
        self.bits
    }

    /// Returns `true` if the bitset has zero bits.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Clears all bits.
    pub fn clear_all(&self) {
        self.words.fill(0);
    }

    /// Returns whether `bit` is set.
    ///
    /// # Panics
    /// Panics if `bit >= len()`.
    #[inline]
    pub fn get(&self, bit: u64) -> bool {
        assert!(bit < self.bits, "bit {bit} out of bounds for bitset of {} bits", self.bits);
        let (word, mask) = bit_word_mask(bit);
        (self.words.get(word) & mask) != 0
    }

    /// Sets `bit`.
    ///
    /// # Panics
    /// Panics if `bit >= len()`.
    #[inline]
    pub fn set(&self, bit: u64) {
        self.test_and_set(bit);
    }

    /// Sets `bit` and returns `true` iff this call observed it previously cleared.
    ///
    /// # Panics
    /// Panics if `bit >= len()`.
    #[inline]
    pub fn test_and_set(&self, bit: u64) -> bool {
        assert!(bit < self.bits, "bit {bit} out of bounds for bitset of {} bits", self.bits);
        let (word, mask) = bit_word_mask(bit);
        if self.words.get(word) & mask != 0 {
            return false;
        }
        let previous = self.words.get_and_update(word, |w| w | mask);
        previous & mask == 0
    }

    /// Clears `bit`.
    ///
    /// # Panics
    /// Panics if `bit >= len()`.
    #[inline]
    pub fn clear(&self, bit: u64) {
        assert!(bit < self.bits, "bit {bit} out of bounds for bitset of {} bits", self.bits);
        let (word, mask) = bit_word_mask(bit);
        if self.words.get(word) & mask != 0 {
            self.words.update(word, |w| w & !mask);
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> u64 {
        self.words.iter().map(|w| u64::from(w.count_ones())).sum()
    }

    /// Returns `true` iff every bit in `[0, len)` is set.
    pub fn all_set(&self) -> bool {
        let full_words = self.bits / WORD_BITS;
        for w in 0..full_words {
            if self.words.get(w) != u64::MAX {
                return false;
            }
        }
        let tail = self.bits % WORD_BITS;
        if tail == 0 {
            return true;
        }
        let mask = (1u64 << tail) - 1;
        self.words.get(full_words) & mask == mask
    }
}

#[inline(always)]
fn bit_word_mask(bit: u64) -> (u64, u64) {
    (bit >> 6, 1u64 << (bit & 63))
}

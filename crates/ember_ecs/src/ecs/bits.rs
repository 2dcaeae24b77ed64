//! # Bit Vectors
//!
//! Growable word-array bitset backing compositions, aspects and every
//! entity-indexed set in the runtime.
//!
//! ## Performance
//!
//! - Set / clear / test: O(1)
//! - Set algebra (`or`, `and_not`, `intersects`): O(n/64)
//! - Iterate set bits: O(words + set bits), skipping clean words

use std::fmt;
use std::hash::{Hash, Hasher};

const WORD_BITS: usize = 64;

/// Growable bitset. 64 bits per `u64` word.
///
/// Bits beyond the backing storage read as clear, so two vectors holding the
/// same set bits compare (and hash) equal regardless of how many trailing
/// zero words either one carries.
#[derive(Clone, Default)]
pub struct BitVector {
    /// Bit storage: 1 = set, 0 = clear.
    words: Vec<u64>,
}

impl BitVector {
    /// Creates an empty bit vector without allocating.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Creates an empty bit vector able to hold `bits` bits without growing.
    #[must_use]
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: vec![0; word_count(bits)],
        }
    }

    /// Creates a bit vector with the given indices set.
    #[must_use]
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut bits = Self::new();
        for index in indices {
            bits.set(index);
        }
        bits
    }

    /// Grows the backing storage so that `bits` bits fit without reallocation.
    pub fn ensure_capacity(&mut self, bits: usize) {
        let words = word_count(bits);
        if words > self.words.len() {
            self.words.resize(words, 0);
        }
    }

    /// Sets the bit at `index`, growing if needed.
    #[inline]
    pub fn set(&mut self, index: usize) {
        let word = index / WORD_BITS;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (index % WORD_BITS);
    }

    /// Sets or clears the bit at `index`.
    #[inline]
    pub fn set_to(&mut self, index: usize, value: bool) {
        if value {
            self.set(index);
        } else {
            self.unset(index);
        }
    }

    /// Clears the bit at `index`. Never grows.
    #[inline]
    pub fn unset(&mut self, index: usize) {
        if let Some(word) = self.words.get_mut(index / WORD_BITS) {
            *word &= !(1 << (index % WORD_BITS));
        }
    }

    /// Checks whether the bit at `index` is set.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        self.words
            .get(index / WORD_BITS)
            .is_some_and(|word| (word >> (index % WORD_BITS)) & 1 == 1)
    }

    /// Clears every bit, keeping the allocation.
    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = 0;
        }
    }

    /// Returns `true` if no bit is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Number of set bits.
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// `self |= other`
    pub fn or(&mut self, other: &Self) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (word, &bits) in self.words.iter_mut().zip(&other.words) {
            *word |= bits;
        }
    }

    /// `self &= other`
    pub fn and(&mut self, other: &Self) {
        for (i, word) in self.words.iter_mut().enumerate() {
            *word &= other.words.get(i).copied().unwrap_or(0);
        }
    }

    /// `self &= !other`
    pub fn and_not(&mut self, other: &Self) {
        for (word, &bits) in self.words.iter_mut().zip(&other.words) {
            *word &= !bits;
        }
    }

    /// Returns `true` if any bit is set in both vectors.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .any(|(&a, &b)| a & b != 0)
    }

    /// Returns `true` if every bit set in `other` is also set in `self`.
    #[must_use]
    pub fn contains_all(&self, other: &Self) -> bool {
        other.words.iter().enumerate().all(|(i, &bits)| {
            let word = self.words.get(i).copied().unwrap_or(0);
            word & bits == bits
        })
    }

    /// Overwrites `self` with the contents of `other`, reusing the allocation.
    pub fn copy_from(&mut self, other: &Self) {
        self.words.clear();
        self.words.extend_from_slice(&other.words);
    }

    /// Index of the first set bit at or after `from`.
    #[must_use]
    pub fn next_set_bit(&self, from: usize) -> Option<usize> {
        let mut word_idx = from / WORD_BITS;
        let mut word = *self.words.get(word_idx)? & (u64::MAX << (from % WORD_BITS));
        loop {
            if word != 0 {
                return Some(word_idx * WORD_BITS + word.trailing_zeros() as usize);
            }
            word_idx += 1;
            word = *self.words.get(word_idx)?;
        }
    }

    /// Iterates over set bit indices in ascending order.
    ///
    /// Uses `trailing_zeros` so clean words are skipped in one step.
    #[must_use]
    pub fn iter(&self) -> Ones<'_> {
        Ones {
            words: &self.words,
            word_idx: 0,
            current_word: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Number of significant words (trailing zero words excluded).
    fn significant_len(&self) -> usize {
        self.words
            .iter()
            .rposition(|&word| word != 0)
            .map_or(0, |last| last + 1)
    }
}

#[inline]
const fn word_count(bits: usize) -> usize {
    (bits + WORD_BITS - 1) / WORD_BITS
}

impl PartialEq for BitVector {
    fn eq(&self, other: &Self) -> bool {
        let len = self.significant_len();
        len == other.significant_len() && self.words[..len] == other.words[..len]
    }
}

impl Eq for BitVector {}

impl Hash for BitVector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.words[..self.significant_len()].hash(state);
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<usize> for BitVector {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::from_indices(iter)
    }
}

impl<'a> IntoIterator for &'a BitVector {
    type Item = usize;
    type IntoIter = Ones<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the set bits of a [`BitVector`].
#[derive(Debug)]
pub struct Ones<'a> {
    words: &'a [u64],
    word_idx: usize,
    current_word: u64,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit = self.current_word.trailing_zeros() as usize;
                // Clear lowest set bit
                self.current_word &= self.current_word - 1;
                return Some(self.word_idx * WORD_BITS + bit);
            }

            self.word_idx += 1;
            self.current_word = *self.words.get(self.word_idx)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(bits: &BitVector) -> u64 {
        let mut hasher = DefaultHasher::new();
        bits.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_set_get_unset() {
        let mut bits = BitVector::new();
        assert!(!bits.get(130));

        bits.set(130);
        assert!(bits.get(130));
        assert!(!bits.get(129));

        bits.unset(130);
        assert!(!bits.get(130));
        assert!(bits.is_empty());
    }

    #[test]
    fn test_unset_out_of_range_is_noop() {
        let mut bits = BitVector::new();
        bits.unset(1000);
        assert!(bits.is_empty());
    }

    #[test]
    fn test_iter_crosses_words() {
        let bits = BitVector::from_indices([0, 63, 64, 200]);
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![0, 63, 64, 200]);
        assert_eq!(bits.cardinality(), 4);
    }

    #[test]
    fn test_next_set_bit() {
        let bits = BitVector::from_indices([5, 70]);
        assert_eq!(bits.next_set_bit(0), Some(5));
        assert_eq!(bits.next_set_bit(5), Some(5));
        assert_eq!(bits.next_set_bit(6), Some(70));
        assert_eq!(bits.next_set_bit(71), None);
    }

    #[test]
    fn test_equality_ignores_trailing_words() {
        let mut wide = BitVector::with_capacity(1024);
        wide.set(3);
        let narrow = BitVector::from_indices([3]);

        assert_eq!(wide, narrow);
        assert_eq!(hash_of(&wide), hash_of(&narrow));
    }

    #[test]
    fn test_set_algebra() {
        let a = BitVector::from_indices([1, 2, 3]);
        let b = BitVector::from_indices([3, 100]);

        let mut union = a.clone();
        union.or(&b);
        assert_eq!(union, BitVector::from_indices([1, 2, 3, 100]));

        let mut diff = union.clone();
        diff.and_not(&b);
        assert_eq!(diff, BitVector::from_indices([1, 2]));

        let mut inter = union;
        inter.and(&b);
        assert_eq!(inter, b);

        assert!(a.intersects(&b));
        assert!(!diff.intersects(&b));
        assert!(a.contains_all(&BitVector::from_indices([1, 3])));
        assert!(!a.contains_all(&b));
        assert!(a.contains_all(&BitVector::new()));
    }
}

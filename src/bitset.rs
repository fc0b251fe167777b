//! Compact bit set over u64 words.
//!
//! Used for the visited-strand flags of the skein backtracking engine
//! and for the pair-choice mask when interleaving keys at a join bag.

/// A simple bit set backed by a vector of u64 words.
///
/// The set grows automatically when setting bits beyond the current
/// capacity.
#[derive(Debug, Clone, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// Number of bits per word.
    const BITS_PER_WORD: usize = 64;

    /// Creates a new empty bit set with the given capacity (in bits).
    pub fn new(capacity: usize) -> Self {
        let num_words = (capacity + Self::BITS_PER_WORD - 1) / Self::BITS_PER_WORD;
        Self {
            words: vec![0; num_words],
        }
    }

    #[inline]
    fn word_and_bit(index: usize) -> (usize, usize) {
        (index / Self::BITS_PER_WORD, index % Self::BITS_PER_WORD)
    }

    /// Returns true if the bit at the given index is set.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let (word, bit) = Self::word_and_bit(index);
        word < self.words.len() && self.words[word] & (1u64 << bit) != 0
    }

    /// Sets the bit at the given index.
    #[inline]
    pub fn insert(&mut self, index: usize) {
        let (word, bit) = Self::word_and_bit(index);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << bit;
    }

    /// Clears the bit at the given index.
    #[inline]
    pub fn remove(&mut self, index: usize) {
        let (word, bit) = Self::word_and_bit(index);
        if word < self.words.len() {
            self.words[word] &= !(1u64 << bit);
        }
    }

    /// Clears all bits.
    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_contains_remove() {
        let mut bs = BitSet::new(100);
        assert!(!bs.contains(42));
        bs.insert(42);
        assert!(bs.contains(42));
        bs.remove(42);
        assert!(!bs.contains(42));
    }

    #[test]
    fn test_auto_grow() {
        let mut bs = BitSet::new(0);
        bs.insert(1000);
        assert!(bs.contains(1000));
        assert!(!bs.contains(999));
    }

    #[test]
    fn test_clear() {
        let mut bs = BitSet::new(128);
        bs.insert(1);
        bs.insert(64);
        bs.insert(127);
        bs.clear();
        assert!(!bs.contains(1));
        assert!(!bs.contains(64));
        assert!(!bs.contains(127));
    }
}

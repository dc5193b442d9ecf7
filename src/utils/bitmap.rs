use static_assertions::const_assert_eq;

type Word = u64;

const WORD_BITS: usize = Word::BITS as usize;

const_assert_eq!(WORD_BITS, 8 * size_of::<Word>());

/// Fixed-length bit set. The length is chosen at construction and never changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitMap {
    words: Box<[Word]>,
    len: usize,
    ones: usize,
}

impl BitMap {
    /// Creates a bit set of `len` cleared bits.
    ///
    /// Storage is allocated once; an allocation failure aborts the process.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)].into_boxed_slice(),
            len,
            ones: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of set bits.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.ones
    }

    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }

        self.words[idx / WORD_BITS] & ((1 as Word) << (idx % WORD_BITS)) != 0
    }

    /// Sets bit `idx` and returns its previous value.
    ///
    /// Panics if `idx` is out of bounds.
    #[inline]
    pub fn set(&mut self, idx: usize) -> bool {
        assert!(idx < self.len, "bit {idx} out of bounds ({})", self.len);

        let mask: Word = 1 << (idx % WORD_BITS);
        let word = &mut self.words[idx / WORD_BITS];
        let was = *word & mask != 0;
        *word |= mask;

        if !was {
            self.ones += 1;
        }

        was
    }

    /// Clears bit `idx` and returns its previous value.
    ///
    /// Panics if `idx` is out of bounds.
    #[inline]
    pub fn clear(&mut self, idx: usize) -> bool {
        assert!(idx < self.len, "bit {idx} out of bounds ({})", self.len);

        let mask: Word = 1 << (idx % WORD_BITS);
        let word = &mut self.words[idx / WORD_BITS];
        let was = *word & mask != 0;
        *word &= !mask;

        if was {
            self.ones -= 1;
        }

        was
    }

    /// Clears every bit.
    pub fn reset(&mut self) {
        self.words.fill(0);
        self.ones = 0;
    }

    /// Index of the lowest clear bit at or after `from`.
    pub fn first_clear_from(&self, from: usize) -> Option<usize> {
        if from >= self.len {
            return None;
        }

        let mut word_idx = from / WORD_BITS;
        // bits below `from` in the first word count as set
        let mut word = self.words[word_idx] | (((1 as Word) << (from % WORD_BITS)) - 1);

        loop {
            if word != Word::MAX {
                let idx = word_idx * WORD_BITS + word.trailing_ones() as usize;

                return (idx < self.len).then_some(idx);
            }

            word_idx += 1;
            word = *self.words.get(word_idx)?;
        }
    }

    /// Iterates over the indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_idx, &word)| {
                let mut rest = word;

                std::iter::from_fn(move || {
                    if rest == 0 {
                        return None;
                    }

                    let bit = rest.trailing_zeros() as usize;
                    rest &= rest - 1;

                    Some(word_idx * WORD_BITS + bit)
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_clear() {
        let map = BitMap::new(130);

        assert_eq!(map.len(), 130);
        assert_eq!(map.count_ones(), 0);
        assert!((0..130).all(|i| !map.get(i)));
        assert_eq!(map.first_clear_from(0), Some(0));
    }

    #[test]
    fn test_set_and_clear_report_previous() {
        let mut map = BitMap::new(10);

        assert!(!map.set(3));
        assert!(map.set(3));
        assert_eq!(map.count_ones(), 1);

        assert!(map.clear(3));
        assert!(!map.clear(3));
        assert_eq!(map.count_ones(), 0);
    }

    #[test]
    fn test_first_clear_crosses_words() {
        let mut map = BitMap::new(200);
        for i in 0..130 {
            map.set(i);
        }

        assert_eq!(map.first_clear_from(0), Some(130));
        assert_eq!(map.first_clear_from(140), Some(140));

        map.clear(64);
        assert_eq!(map.first_clear_from(0), Some(64));
        assert_eq!(map.first_clear_from(65), Some(130));
    }

    #[test]
    fn test_first_clear_ignores_padding_bits() {
        let mut map = BitMap::new(70);
        for i in 0..70 {
            map.set(i);
        }

        assert_eq!(map.first_clear_from(0), None);
        assert_eq!(map.first_clear_from(69), None);
        assert_eq!(map.first_clear_from(70), None);
    }

    #[test]
    fn test_full_word_boundary() {
        let mut map = BitMap::new(128);
        for i in 0..128 {
            map.set(i);
        }

        assert_eq!(map.first_clear_from(0), None);
    }

    #[test]
    fn test_iter_ones_and_reset() {
        let mut map = BitMap::new(100);
        for i in [0, 5, 63, 64, 99] {
            map.set(i);
        }

        assert_eq!(map.iter_ones().collect::<Vec<_>>(), vec![0, 5, 63, 64, 99]);

        map.reset();
        assert_eq!(map.count_ones(), 0);
        assert_eq!(map.iter_ones().count(), 0);
    }

    #[test]
    fn test_get_out_of_bounds_is_false() {
        let map = BitMap::new(4);
        assert!(!map.get(4));
        assert!(!map.get(usize::MAX));
    }
}

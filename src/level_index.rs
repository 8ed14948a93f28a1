//! Level Index - two-tier occupancy bitmap over discrete price levels.
//!
//! The lower tier holds one bit per price level. The upper tier holds one
//! bit per lower-tier word, set iff that word is non-zero. Best-price lookup
//! finds the extreme non-zero summary word, then uses a native bit-scan
//! (`leading_zeros` / `trailing_zeros`) twice, so it never walks individual
//! levels. One summary word covers 4096 levels; for the default 10_000 level
//! book the summary is three words long.

const WORD_BITS: usize = 64;

/// Occupancy bitmap for one side of the book.
#[derive(Clone, Debug)]
pub struct LevelIndex {
    /// Bit `i % 64` of word `i / 64` is set iff level `i` is occupied
    words: Box<[u64]>,
    /// Bit `w % 64` of summary word `w / 64` is set iff `words[w] != 0`
    summary: Box<[u64]>,
    /// Number of addressable levels
    len: usize,
}

#[inline]
const fn split(i: usize) -> (usize, u64) {
    (i / WORD_BITS, 1u64 << (i % WORD_BITS))
}

impl LevelIndex {
    /// Create an empty index addressing `len` levels.
    pub fn new(len: usize) -> Self {
        let word_count = len.div_ceil(WORD_BITS);
        let summary_count = word_count.div_ceil(WORD_BITS);
        Self {
            words: vec![0u64; word_count].into_boxed_slice(),
            summary: vec![0u64; summary_count].into_boxed_slice(),
            len,
        }
    }

    /// Number of addressable levels.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.summary.iter().all(|&s| s == 0)
    }

    /// Mark level `i` occupied.
    #[inline]
    pub fn set(&mut self, i: usize) {
        debug_assert!(i < self.len, "level {i} out of range");
        let (w, bit) = split(i);
        self.words[w] |= bit;
        let (s, sbit) = split(w);
        self.summary[s] |= sbit;
    }

    /// Mark level `i` empty.
    #[inline]
    pub fn clear(&mut self, i: usize) {
        debug_assert!(i < self.len, "level {i} out of range");
        let (w, bit) = split(i);
        self.words[w] &= !bit;
        if self.words[w] == 0 {
            let (s, sbit) = split(w);
            self.summary[s] &= !sbit;
        }
    }

    /// Returns true if level `i` is occupied.
    #[inline]
    pub fn contains(&self, i: usize) -> bool {
        if i >= self.len {
            return false;
        }
        let (w, bit) = split(i);
        self.words[w] & bit != 0
    }

    /// Highest occupied level.
    #[inline]
    pub fn highest(&self) -> Option<usize> {
        let (s, summary) = self
            .summary
            .iter()
            .enumerate()
            .rev()
            .find(|&(_, &word)| word != 0)?;
        let w = s * WORD_BITS + (WORD_BITS - 1 - summary.leading_zeros() as usize);
        let word = self.words[w];
        Some(w * WORD_BITS + (WORD_BITS - 1 - word.leading_zeros() as usize))
    }

    /// Lowest occupied level.
    #[inline]
    pub fn lowest(&self) -> Option<usize> {
        let (s, summary) = self
            .summary
            .iter()
            .enumerate()
            .find(|&(_, &word)| word != 0)?;
        let w = s * WORD_BITS + summary.trailing_zeros() as usize;
        let word = self.words[w];
        Some(w * WORD_BITS + word.trailing_zeros() as usize)
    }

    /// Number of occupied levels.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Occupied levels in ascending order.
    pub fn iter_ascending(&self) -> Ascending<'_> {
        Ascending {
            words: &self.words,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Occupied levels in descending order.
    pub fn iter_descending(&self) -> Descending<'_> {
        let word_idx = self.words.len();
        Descending {
            words: &self.words,
            word_idx,
            current: self.words.last().copied().unwrap_or(0),
        }
    }
}

/// Ascending iterator over occupied levels; skips empty words.
pub struct Ascending<'a> {
    words: &'a [u64],
    word_idx: usize,
    current: u64,
}

impl Iterator for Ascending<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.word_idx += 1;
            self.current = *self.words.get(self.word_idx)?;
        }
        let bit = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        Some(self.word_idx * WORD_BITS + bit)
    }
}

/// Descending iterator over occupied levels; skips empty words.
pub struct Descending<'a> {
    words: &'a [u64],
    /// One past the index of the word held in `current`
    word_idx: usize,
    current: u64,
}

impl Iterator for Descending<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            if self.word_idx <= 1 {
                return None;
            }
            self.word_idx -= 1;
            self.current = self.words[self.word_idx - 1];
        }
        let bit = WORD_BITS - 1 - self.current.leading_zeros() as usize;
        self.current &= !(1u64 << bit);
        Some((self.word_idx - 1) * WORD_BITS + bit)
    }
}

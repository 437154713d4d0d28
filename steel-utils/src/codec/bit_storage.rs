/// A fixed-length array of unsigned integers packed `bits` wide into `u64` words.
///
/// Entries never straddle two words, so each word holds `64 / bits` entries and
/// the unused high bits of every word stay zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStorage {
    data: Box<[u64]>,
    bits: u32,
    size: usize,
    values_per_word: usize,
    mask: u64,
}

impl BitStorage {
    /// Creates a zeroed storage of `size` entries, each `bits` wide.
    ///
    /// # Panics
    /// If `bits` is not in `1..=32`.
    #[must_use]
    pub fn new(bits: u32, size: usize) -> Self {
        assert!((1..=32).contains(&bits), "bit width must be 1..=32, got {bits}");
        let values_per_word = (64 / bits) as usize;
        Self {
            data: vec![0; size.div_ceil(values_per_word)].into_boxed_slice(),
            bits,
            size,
            values_per_word,
            mask: (1u64 << bits) - 1,
        }
    }

    /// The minimal bit width able to hold every value in `0..=max_value`.
    #[must_use]
    pub fn bits_for(max_value: u32) -> u32 {
        (u32::BITS - max_value.leading_zeros()).max(1)
    }

    /// Reads the entry at `index`.
    #[must_use]
    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        assert!(index < self.size, "index {index} out of bounds ({})", self.size);
        let word = self.data[index / self.values_per_word];
        let shift = (index % self.values_per_word) as u32 * self.bits;
        ((word >> shift) & self.mask) as u32
    }

    /// Writes the entry at `index`.
    #[inline]
    pub fn set(&mut self, index: usize, value: u32) {
        assert!(index < self.size, "index {index} out of bounds ({})", self.size);
        debug_assert!(u64::from(value) <= self.mask, "value {value} wider than {} bits", self.bits);
        let word = &mut self.data[index / self.values_per_word];
        let shift = (index % self.values_per_word) as u32 * self.bits;
        *word = (*word & !(self.mask << shift)) | ((u64::from(value) & self.mask) << shift);
    }

    /// Sets every entry to `value`.
    pub fn fill(&mut self, value: u32) {
        for index in 0..self.size {
            self.set(index, value);
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the storage holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

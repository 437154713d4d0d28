//! A set of block positions grouped into 4x4x4 blocks.
//!
//! Flood fill work is spatially clustered, so one hash map slot holding a 64-bit
//! presence mask per 4x4x4 block replaces up to 64 individual entries.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use steel_utils::BlockPos;

/// Splits a packed block position into its block key and the bit inside the block.
#[inline]
fn split(pos: i64) -> (i64, u64) {
    let x = BlockPos::x(pos);
    let y = BlockPos::y(pos);
    let z = BlockPos::z(pos);
    let outer = BlockPos::pack(x >> 2, y >> 2, z >> 2);
    let inner = (x & 3) | ((y & 3) << 2) | ((z & 3) << 4);
    (outer, 1u64 << inner)
}

#[inline]
fn join(outer: i64, inner: u32) -> i64 {
    let inner = inner as i32;
    BlockPos::pack(
        (BlockPos::x(outer) << 2) | (inner & 3),
        (BlockPos::y(outer) << 2) | ((inner >> 2) & 3),
        (BlockPos::z(outer) << 2) | ((inner >> 4) & 3),
    )
}

/// An insertion ordered set of packed block positions.
///
/// Blocks are kept in the order they were first touched; [`remove_first`] drains the
/// oldest block, lowest bit first.
///
/// [`remove_first`]: SparsePositionSet::remove_first
#[derive(Debug, Default, Clone)]
pub struct SparsePositionSet {
    /// Blocks in insertion order. Emptied blocks stay behind as zero masks until
    /// they reach the front or the deque is compacted.
    slots: VecDeque<(i64, u64)>,
    /// Block key to absolute slot sequence number.
    index: FxHashMap<i64, usize>,
    /// Sequence number of `slots[0]`.
    head: usize,
    len: usize,
}

impl SparsePositionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a position. Returns `false` if it was already present.
    pub fn add(&mut self, pos: i64) -> bool {
        let (outer, bit) = split(pos);
        if let Some(&seq) = self.index.get(&outer) {
            let mask = &mut self.slots[seq - self.head].1;
            if *mask & bit != 0 {
                return false;
            }
            *mask |= bit;
        } else {
            self.index.insert(outer, self.head + self.slots.len());
            self.slots.push_back((outer, bit));
        }
        self.len += 1;
        true
    }

    /// Removes a position. Returns `false` if it was not present.
    pub fn remove(&mut self, pos: i64) -> bool {
        let (outer, bit) = split(pos);
        let Some(&seq) = self.index.get(&outer) else {
            return false;
        };
        let mask = &mut self.slots[seq - self.head].1;
        if *mask & bit == 0 {
            return false;
        }
        *mask &= !bit;
        if *mask == 0 {
            self.index.remove(&outer);
        }
        self.len -= 1;
        self.trim_front();
        self.maybe_compact();
        true
    }

    /// Removes and returns the first position in insertion order.
    pub fn remove_first(&mut self) -> Option<i64> {
        self.trim_front();
        let (outer, mask) = self.slots.front_mut()?;
        let outer = *outer;
        let inner = mask.trailing_zeros();
        *mask &= *mask - 1;
        if *mask == 0 {
            self.index.remove(&outer);
            self.slots.pop_front();
            self.head += 1;
            self.trim_front();
        }
        self.len -= 1;
        Some(join(outer, inner))
    }

    /// Whether the position is present.
    #[must_use]
    pub fn contains(&self, pos: i64) -> bool {
        let (outer, bit) = split(pos);
        self.index
            .get(&outer)
            .is_some_and(|&seq| self.slots[seq - self.head].1 & bit != 0)
    }

    /// Number of positions in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of occupied 4x4x4 blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.index.len()
    }

    /// Removes every position.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.head = 0;
        self.len = 0;
    }

    fn trim_front(&mut self) {
        while self.slots.front().is_some_and(|&(_, mask)| mask == 0) {
            self.slots.pop_front();
            self.head += 1;
        }
    }

    fn maybe_compact(&mut self) {
        if self.slots.len() <= 2 * self.index.len() + 64 {
            return;
        }
        self.slots.retain(|&(_, mask)| mask != 0);
        self.head = 0;
        for (seq, &(outer, _)) in self.slots.iter().enumerate() {
            self.index.insert(outer, seq);
        }
    }
}

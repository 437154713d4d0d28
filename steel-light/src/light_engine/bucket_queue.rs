//! Priority queue of positions bucketed by a small integer level.

use crate::sparse_position_set::SparsePositionSet;

/// A min-priority queue over packed positions with `level_count` discrete levels.
///
/// Each level owns an insertion ordered [`SparsePositionSet`]. The lowest non-empty
/// level is cached and only rescanned, forward, when its bucket runs dry.
#[derive(Debug)]
pub struct BucketQueue {
    buckets: Box<[SparsePositionSet]>,
    first_queued_level: usize,
}

impl BucketQueue {
    /// Creates a queue with levels `0..level_count`.
    ///
    /// # Panics
    /// If `level_count` is zero or 254 and above.
    #[must_use]
    pub fn new(level_count: usize) -> Self {
        assert!(
            (1..254).contains(&level_count),
            "level count must be in 1..254, got {level_count}"
        );
        Self {
            buckets: (0..level_count).map(|_| SparsePositionSet::new()).collect(),
            first_queued_level: level_count,
        }
    }

    /// Number of levels.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.buckets.len()
    }

    fn clamp_level(&self, level: usize) -> usize {
        debug_assert!(
            level < self.buckets.len(),
            "bucket level {level} out of range 0..{}",
            self.buckets.len()
        );
        level.min(self.buckets.len() - 1)
    }

    /// Queues `pos` at `level`. Returns `false` if it was already queued there.
    pub fn enqueue(&mut self, pos: i64, level: usize) -> bool {
        let level = self.clamp_level(level);
        let added = self.buckets[level].add(pos);
        if level < self.first_queued_level {
            self.first_queued_level = level;
        }
        added
    }

    /// Removes `pos` from the bucket at `level`.
    ///
    /// When that bucket was the lowest one and is now empty, the cached minimum is
    /// rescanned up to `levels_bound` (exclusive).
    pub fn dequeue(&mut self, pos: i64, level: usize, levels_bound: usize) -> bool {
        let level = self.clamp_level(level);
        let removed = self.buckets[level].remove(pos);
        if self.buckets[level].is_empty() && self.first_queued_level == level {
            self.check_first_queued_level(levels_bound);
        }
        removed
    }

    /// Removes and returns a position from the lowest non-empty level.
    pub fn dequeue_min(&mut self) -> Option<(i64, usize)> {
        let level = self.first_queued_level;
        let bucket = self.buckets.get_mut(level)?;
        let pos = bucket.remove_first()?;
        if bucket.is_empty() {
            self.check_first_queued_level(self.buckets.len());
        }
        Some((pos, level))
    }

    /// The lowest level holding a position, if any.
    #[must_use]
    pub fn first_queued_level(&self) -> Option<usize> {
        (self.first_queued_level < self.buckets.len()).then_some(self.first_queued_level)
    }

    /// Whether every bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_queued_level >= self.buckets.len()
    }

    /// Total number of queued positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(SparsePositionSet::len).sum()
    }

    /// Empties every bucket.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.first_queued_level = self.buckets.len();
    }

    fn check_first_queued_level(&mut self, levels_bound: usize) {
        let bound = levels_bound.min(self.buckets.len());
        let old = self.first_queued_level;
        self.first_queued_level = (old + 1..bound)
            .find(|&level| !self.buckets[level].is_empty())
            .unwrap_or(self.buckets.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steel_utils::BlockPos;

    fn pos(x: i32) -> i64 {
        BlockPos::new(x, 0, 0).as_long()
    }

    #[test]
    fn test_dequeue_min_is_never_above_a_queued_level() {
        let mut queue = BucketQueue::new(16);
        let levels = [7, 3, 15, 3, 0, 9, 12, 1];
        for (i, &level) in levels.iter().enumerate() {
            queue.enqueue(pos(i as i32 * 10), level);
        }

        let mut seen = Vec::new();
        while let Some((_, level)) = queue.dequeue_min() {
            seen.push(level);
        }
        let mut sorted = levels.to_vec();
        sorted.sort_unstable();
        assert_eq!(seen, sorted);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_within_a_level() {
        let mut queue = BucketQueue::new(4);
        queue.enqueue(pos(40), 2);
        queue.enqueue(pos(0), 2);
        assert_eq!(queue.dequeue_min(), Some((pos(40), 2)));
        assert_eq!(queue.dequeue_min(), Some((pos(0), 2)));
    }

    #[test]
    fn test_dequeue_specific_entry_updates_minimum() {
        let mut queue = BucketQueue::new(16);
        queue.enqueue(pos(1), 2);
        queue.enqueue(pos(2), 5);
        assert_eq!(queue.first_queued_level(), Some(2));

        assert!(queue.dequeue(pos(1), 2, 16));
        assert_eq!(queue.first_queued_level(), Some(5));
        assert!(!queue.dequeue(pos(1), 2, 16));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    #[should_panic(expected = "level count")]
    fn test_rejects_oversized_level_count() {
        let _ = BucketQueue::new(254);
    }
}

//! Prioritized queue of pending propagation jobs.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::{LEVEL_COUNT, MAX_LEVEL};

use super::{bucket_queue::BucketQueue, queue_entry::QueueEntry};

/// A queue of (`position`, `QueueEntry`) jobs, brightest first.
///
/// Positions are ordered through a [`BucketQueue`] keyed by `15 - level`, so the
/// brightest pending job is always processed next. At most one job exists per
/// position: queueing a position twice merges both entries with
/// [`QueueEntry::merge`] and moves it to the merged level's bucket.
#[derive(Debug)]
pub struct LightQueue {
    buckets: BucketQueue,
    entries: FxHashMap<i64, QueueEntry>,
}

#[inline]
const fn priority(entry: QueueEntry) -> usize {
    (MAX_LEVEL - entry.level()) as usize
}

impl LightQueue {
    /// Creates a new empty light queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: BucketQueue::new(LEVEL_COUNT),
            entries: FxHashMap::default(),
        }
    }

    /// Enqueues a position and queue entry for processing.
    pub fn enqueue(&mut self, pos: i64, entry: QueueEntry) {
        match self.entries.entry(pos) {
            Entry::Occupied(mut occupied) => {
                let old = *occupied.get();
                let merged = old.merge(entry);
                if merged.level() != old.level() {
                    self.buckets.dequeue(pos, priority(old), LEVEL_COUNT);
                    self.buckets.enqueue(pos, priority(merged));
                }
                occupied.insert(merged);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                self.buckets.enqueue(pos, priority(entry));
            }
        }
    }

    /// Dequeues the brightest pending job.
    ///
    /// Returns `None` if the queue is empty.
    pub fn dequeue(&mut self) -> Option<(i64, QueueEntry)> {
        let (pos, _) = self.buckets.dequeue_min()?;
        let entry = self.entries.remove(&pos)?;
        Some((pos, entry))
    }

    /// Checks if the queue is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of queued positions.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Clears all entries from the queue.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.entries.clear();
    }
}

impl Default for LightQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light_engine::Direction;
    use steel_utils::BlockPos;

    #[test]
    #[allow(clippy::unwrap_used)] // Tests are allowed to panic
    fn test_brightest_first() {
        let mut queue = LightQueue::new();
        let dim = BlockPos::new(10, 64, 20).as_long();
        let bright = BlockPos::new(11, 64, 20).as_long();
        queue.enqueue(dim, QueueEntry::decrease_all_directions(5));
        queue.enqueue(bright, QueueEntry::increase_from_emission(14, true));

        assert_eq!(queue.len(), 2);
        let (first, entry) = queue.dequeue().unwrap();
        assert_eq!(first, bright);
        assert_eq!(entry.level(), 14);
        let (second, _) = queue.dequeue().unwrap();
        assert_eq!(second, dim);
        assert!(queue.is_empty());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_same_position_merges() {
        let mut queue = LightQueue::new();
        let pos = BlockPos::new(0, 0, 0).as_long();
        let other = BlockPos::new(5, 0, 0).as_long();
        queue.enqueue(pos, QueueEntry::increase_only_one_direction(3, false, Direction::Up));
        queue.enqueue(other, QueueEntry::increase_only_one_direction(8, false, Direction::Up));
        queue.enqueue(pos, QueueEntry::increase_only_one_direction(12, false, Direction::East));
        assert_eq!(queue.len(), 2);

        let (first, entry) = queue.dequeue().unwrap();
        assert_eq!(first, pos);
        assert_eq!(entry.level(), 12);
        assert!(entry.should_propagate(Direction::Up));
        assert!(entry.should_propagate(Direction::East));
        assert_eq!(queue.dequeue().unwrap().0, other);
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_clear() {
        let mut queue = LightQueue::new();
        queue.enqueue(
            BlockPos::new(0, 0, 0).as_long(),
            QueueEntry::decrease_all_directions(10),
        );
        queue.enqueue(
            BlockPos::new(1, 1, 1).as_long(),
            QueueEntry::decrease_all_directions(5),
        );

        assert_eq!(queue.len(), 2);
        queue.clear();
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
    }
}

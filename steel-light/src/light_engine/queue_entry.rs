//! Packed work items for the propagation queues.

use crate::MAX_LEVEL;

use super::direction::Direction;

/// One pending propagation step, packed into a word.
///
/// ```text
/// bits 0-3   level
/// bits 4-9   directions still to visit, bit 4 + ordinal
/// bit  10    the source cell has an empty occlusion shape
/// bit  11    the level came from the cell's own emission
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry(u64);

impl QueueEntry {
    const LEVEL_MASK: u64 = 0x0F;
    const DIRECTIONS_MASK: u64 = 0x3F0;
    const EMPTY_SHAPE_FLAG: u64 = 0x400;
    const EMISSION_FLAG: u64 = 0x800;

    /// Decrease with level 1 in every direction.
    ///
    /// Zeroes nothing but makes every lit neighbor re-propagate into the position,
    /// which is how a cell that may have become more transparent pulls light in.
    pub const PULL_LIGHT_IN: Self = Self::decrease_all_directions(1);

    /// Level carried by the entry.
    #[must_use]
    #[inline]
    pub const fn level(self) -> u8 {
        (self.0 & Self::LEVEL_MASK) as u8
    }

    /// Whether `dir` is still to be visited.
    #[must_use]
    #[inline]
    pub const fn should_propagate(self, dir: Direction) -> bool {
        let bit = 1u64 << (dir as u8 + 4);
        (self.0 & bit) != 0
    }

    /// The six direction flags as a mask, bit `n` for direction ordinal `n`.
    #[must_use]
    #[inline]
    pub const fn directions(self) -> u8 {
        ((self.0 & Self::DIRECTIONS_MASK) >> 4) as u8
    }

    /// Set when the source cell has no occluding faces, so the face test can be skipped.
    #[must_use]
    #[inline]
    pub const fn is_from_empty_shape(self) -> bool {
        (self.0 & Self::EMPTY_SHAPE_FLAG) != 0
    }

    /// Set for a cell's own emission.
    #[must_use]
    #[inline]
    pub const fn is_from_emission(self) -> bool {
        (self.0 & Self::EMISSION_FLAG) != 0
    }

    #[must_use]
    #[inline]
    const fn with_level(self, level: u8) -> Self {
        debug_assert!(level <= MAX_LEVEL, "Light level must be 0-15");
        Self((self.0 & !Self::LEVEL_MASK) | (level as u64 & Self::LEVEL_MASK))
    }

    #[must_use]
    #[inline]
    const fn with_direction(self, dir: Direction) -> Self {
        Self(self.0 | (1u64 << (dir as u8 + 4)))
    }

    #[must_use]
    #[inline]
    const fn without_direction(self, dir: Direction) -> Self {
        Self(self.0 & !(1u64 << (dir as u8 + 4)))
    }

    const fn shape_flag(from_empty_shape: bool) -> u64 {
        if from_empty_shape {
            Self::EMPTY_SHAPE_FLAG
        } else {
            0
        }
    }

    /// Removal of `level` spreading to all six neighbors.
    #[must_use]
    pub const fn decrease_all_directions(level: u8) -> Self {
        Self(Self::DIRECTIONS_MASK).with_level(level)
    }

    /// Removal spreading everywhere but back through `skip_dir`.
    #[must_use]
    pub const fn decrease_skip_one_direction(level: u8, skip_dir: Direction) -> Self {
        Self(Self::DIRECTIONS_MASK)
            .without_direction(skip_dir)
            .with_level(level)
    }

    /// Light a cell emits itself.
    #[must_use]
    pub const fn increase_from_emission(level: u8, from_empty_shape: bool) -> Self {
        Self(Self::DIRECTIONS_MASK | Self::EMISSION_FLAG | Self::shape_flag(from_empty_shape))
            .with_level(level)
    }

    /// Light arriving at a cell that should spread to all six neighbors.
    #[must_use]
    pub const fn increase_all_directions(level: u8, from_empty_shape: bool) -> Self {
        Self(Self::DIRECTIONS_MASK | Self::shape_flag(from_empty_shape)).with_level(level)
    }

    /// Light that arrived through `skip_dir` and spreads onward.
    #[must_use]
    pub const fn increase_skip_one_direction(
        level: u8,
        from_empty_shape: bool,
        skip_dir: Direction,
    ) -> Self {
        Self(Self::DIRECTIONS_MASK | Self::shape_flag(from_empty_shape))
            .without_direction(skip_dir)
            .with_level(level)
    }

    /// Light pushed across a single face, used for section and column edges.
    #[must_use]
    pub const fn increase_only_one_direction(
        level: u8,
        from_empty_shape: bool,
        dir: Direction,
    ) -> Self {
        Self(Self::shape_flag(from_empty_shape))
            .with_direction(dir)
            .with_level(level)
    }

    /// Combines two entries queued for the same position.
    ///
    /// The result carries the higher level, the union of directions and the
    /// emission flag of either. The empty shape shortcut survives only if both
    /// entries had it.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let level = if self.level() > other.level() {
            self.level()
        } else {
            other.level()
        };
        let flags = (self.0 | other.0) & (Self::DIRECTIONS_MASK | Self::EMISSION_FLAG);
        let shape = self.0 & other.0 & Self::EMPTY_SHAPE_FLAG;
        Self(flags | shape).with_level(level)
    }
}

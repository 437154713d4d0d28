//! The six faces a cell shares with its neighbors.

use steel_utils::BlockPos;

/// A step to one of the six face neighbors.
///
/// The discriminant is the bit index of the direction in `QueueEntry` flags
/// (shifted by 4) and in `OcclusionShape`. Opposite directions differ only in
/// the lowest bit.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// -Y
    Down = 0,
    /// +Y
    Up = 1,
    /// -Z
    North = 2,
    /// +Z
    South = 3,
    /// -X
    West = 4,
    /// +X
    East = 5,
}

/// `(dx, dy, dz)` per discriminant.
const OFFSETS: [(i32, i32, i32); 6] = [
    (0, -1, 0),
    (0, 1, 0),
    (0, 0, -1),
    (0, 0, 1),
    (-1, 0, 0),
    (1, 0, 0),
];

impl Direction {
    /// Every direction, in discriminant order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// The directions that keep y fixed.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// The direction pointing back.
    #[must_use]
    pub const fn opposite(self) -> Self {
        Self::ALL[(self as usize) ^ 1]
    }

    /// The unit step as `(dx, dy, dz)`.
    #[must_use]
    pub const fn offset(self) -> (i32, i32, i32) {
        OFFSETS[self as usize]
    }

    /// One step from a packed block position.
    #[must_use]
    #[inline]
    pub const fn relative_long(self, packed: i64) -> i64 {
        let (dx, dy, dz) = self.offset();
        BlockPos::offset_long(packed, dx, dy, dz)
    }

    /// One step from `pos`.
    #[must_use]
    pub const fn relative(self, pos: BlockPos) -> BlockPos {
        let (dx, dy, dz) = self.offset();
        pos.offset(dx, dy, dz)
    }
}

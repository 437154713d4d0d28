// Wrapper types making it harder to accidentaly use the wrong underlying type.
//
// Every position type can be packed into a single `i64` key. The packed form is what
// hash maps and queues store, so offsets and section truncation are defined on it too.

use serde::{Deserialize, Serialize};

use crate::math::{vector2::Vector2, vector3::Vector3};

const PACKED_XZ_LENGTH: u32 = 26;
const PACKED_Y_LENGTH: u32 = 64 - 2 * PACKED_XZ_LENGTH;
const PACKED_XZ_MASK: i64 = (1 << PACKED_XZ_LENGTH) - 1;
const PACKED_Y_MASK: i64 = (1 << PACKED_Y_LENGTH) - 1;
const Z_OFFSET: u32 = PACKED_Y_LENGTH;
const X_OFFSET: u32 = PACKED_Y_LENGTH + PACKED_XZ_LENGTH;

/// A chunk position: one 16x16 column of sections, in chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos(pub Vector2<i32>);

impl ChunkPos {
    /// Creates a chunk position from its x and z coordinates.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self(Vector2::new(x, z))
    }

    /// Packs the position into an `i64` key (x in the low half, z in the high half).
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        (self.0.x as u32 as i64) | ((self.0.y as i64) << 32)
    }

    /// Unpacks a key produced by [`ChunkPos::as_i64`].
    #[must_use]
    pub const fn from_i64(packed: i64) -> Self {
        Self::new(packed as i32, (packed >> 32) as i32)
    }

    /// The chunk containing the given block.
    #[must_use]
    pub const fn from_block(pos: BlockPos) -> Self {
        Self::new(pos.0.x >> 4, pos.0.z >> 4)
    }

    /// Lowest block x coordinate inside this chunk.
    #[must_use]
    pub const fn min_block_x(self) -> i32 {
        self.0.x << 4
    }

    /// Lowest block z coordinate inside this chunk.
    #[must_use]
    pub const fn min_block_z(self) -> i32 {
        self.0.y << 4
    }
}

/// A block position in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos(pub Vector3<i32>);

impl BlockPos {
    /// Creates a block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// Packs the position into an `i64`: 26 bits x, 26 bits z, 12 bits y.
    #[must_use]
    pub const fn as_long(self) -> i64 {
        Self::pack(self.0.x, self.0.y, self.0.z)
    }

    /// Unpacks a key produced by [`BlockPos::as_long`].
    #[must_use]
    pub const fn of_long(packed: i64) -> Self {
        Self::new(Self::x(packed), Self::y(packed), Self::z(packed))
    }

    /// Packs raw coordinates.
    #[must_use]
    pub const fn pack(x: i32, y: i32, z: i32) -> i64 {
        ((x as i64 & PACKED_XZ_MASK) << X_OFFSET)
            | (y as i64 & PACKED_Y_MASK)
            | ((z as i64 & PACKED_XZ_MASK) << Z_OFFSET)
    }

    /// The x coordinate of a packed position.
    #[must_use]
    #[inline]
    pub const fn x(packed: i64) -> i32 {
        (packed >> X_OFFSET) as i32
    }

    /// The y coordinate of a packed position.
    #[must_use]
    #[inline]
    pub const fn y(packed: i64) -> i32 {
        ((packed << (64 - PACKED_Y_LENGTH)) >> (64 - PACKED_Y_LENGTH)) as i32
    }

    /// The z coordinate of a packed position.
    #[must_use]
    #[inline]
    pub const fn z(packed: i64) -> i32 {
        ((packed << (64 - Z_OFFSET - PACKED_XZ_LENGTH)) >> (64 - PACKED_XZ_LENGTH)) as i32
    }

    /// Offsets a packed position.
    #[must_use]
    #[inline]
    pub const fn offset_long(packed: i64, dx: i32, dy: i32, dz: i32) -> i64 {
        Self::pack(
            Self::x(packed) + dx,
            Self::y(packed) + dy,
            Self::z(packed) + dz,
        )
    }

    /// Returns this position moved by the given delta.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.0.x + dx, self.0.y + dy, self.0.z + dz)
    }

    /// The section containing this position.
    #[must_use]
    pub const fn section(self) -> SectionPos {
        SectionPos::of_block(self)
    }
}

/// The position of a 16x16x16 section, in section coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionPos(pub Vector3<i32>);

impl SectionPos {
    /// Creates a section position from section coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// The section containing a block position.
    #[must_use]
    pub const fn of_block(pos: BlockPos) -> Self {
        Self::new(pos.0.x >> 4, pos.0.y >> 4, pos.0.z >> 4)
    }

    /// The packed section key of a packed block position.
    #[must_use]
    #[inline]
    pub const fn block_to_section(packed_block: i64) -> i64 {
        Self::pack(
            BlockPos::x(packed_block) >> 4,
            BlockPos::y(packed_block) >> 4,
            BlockPos::z(packed_block) >> 4,
        )
    }

    /// Packs the position into an `i64`: 22 bits x, 22 bits z, 20 bits y.
    #[must_use]
    pub const fn as_long(self) -> i64 {
        Self::pack(self.0.x, self.0.y, self.0.z)
    }

    /// Unpacks a key produced by [`SectionPos::as_long`].
    #[must_use]
    pub const fn of_long(packed: i64) -> Self {
        Self::new(Self::x(packed), Self::y(packed), Self::z(packed))
    }

    /// Packs raw section coordinates.
    #[must_use]
    pub const fn pack(x: i32, y: i32, z: i32) -> i64 {
        ((x as i64 & 0x3F_FFFF) << 42) | (y as i64 & 0xF_FFFF) | ((z as i64 & 0x3F_FFFF) << 20)
    }

    /// The x coordinate of a packed section position.
    #[must_use]
    #[inline]
    pub const fn x(packed: i64) -> i32 {
        (packed >> 42) as i32
    }

    /// The y coordinate of a packed section position.
    #[must_use]
    #[inline]
    pub const fn y(packed: i64) -> i32 {
        ((packed << 44) >> 44) as i32
    }

    /// The z coordinate of a packed section position.
    #[must_use]
    #[inline]
    pub const fn z(packed: i64) -> i32 {
        ((packed << 22) >> 42) as i32
    }

    /// Offsets a packed section position.
    #[must_use]
    #[inline]
    pub const fn offset_long(packed: i64, dx: i32, dy: i32, dz: i32) -> i64 {
        Self::pack(
            Self::x(packed) + dx,
            Self::y(packed) + dy,
            Self::z(packed) + dz,
        )
    }

    /// The column this section belongs to.
    #[must_use]
    pub const fn chunk(self) -> ChunkPos {
        ChunkPos::new(self.0.x, self.0.z)
    }

    /// The packed column key of a packed section position.
    #[must_use]
    pub const fn chunk_key(packed: i64) -> i64 {
        ChunkPos::new(Self::x(packed), Self::z(packed)).as_i64()
    }

    /// The lowest block corner of this section.
    #[must_use]
    pub const fn origin(self) -> BlockPos {
        BlockPos::new(self.0.x << 4, self.0.y << 4, self.0.z << 4)
    }
}

/// The position of a block coordinate inside its section (0..16).
#[must_use]
#[inline]
pub const fn section_relative(coord: i32) -> usize {
    (coord & 15) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_pos_packing() {
        for pos in [
            BlockPos::new(0, 0, 0),
            BlockPos::new(-1, -64, -1),
            BlockPos::new(30_000_000, 319, -30_000_000),
            BlockPos::new(-17, 2047, 33),
        ] {
            assert_eq!(BlockPos::of_long(pos.as_long()), pos);
        }
    }

    #[test]
    fn test_block_offset_on_packed_form() {
        let packed = BlockPos::new(15, -1, 0).as_long();
        let moved = BlockPos::offset_long(packed, 1, 1, -1);
        assert_eq!(BlockPos::of_long(moved), BlockPos::new(16, 0, -1));
    }

    #[test]
    fn test_section_packing() {
        let section = SectionPos::new(-3, -4, 1_000);
        assert_eq!(SectionPos::of_long(section.as_long()), section);
        assert_eq!(
            SectionPos::block_to_section(BlockPos::new(-1, -1, 16).as_long()),
            SectionPos::new(-1, -1, 1).as_long()
        );
    }

    #[test]
    fn test_chunk_packing() {
        let chunk = ChunkPos::new(-5, 7);
        assert_eq!(ChunkPos::from_i64(chunk.as_i64()), chunk);
        assert_eq!(
            SectionPos::chunk_key(SectionPos::new(-5, 3, 7).as_long()),
            chunk.as_i64()
        );
    }
}

//! The view of the voxel world that the light engine reads from.

use bitflags::bitflags;
use steel_utils::{BlockPos, SectionPos};

use crate::light_engine::Direction;

bitflags! {
    /// The faces of a cell that its occlusion shape fully covers.
    ///
    /// Bit `n` is the face pointing towards the direction with ordinal `n`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OcclusionShape: u8 {
        /// The bottom face.
        const DOWN = 1 << 0;
        /// The top face.
        const UP = 1 << 1;
        /// The north (-Z) face.
        const NORTH = 1 << 2;
        /// The south (+Z) face.
        const SOUTH = 1 << 3;
        /// The west (-X) face.
        const WEST = 1 << 4;
        /// The east (+X) face.
        const EAST = 1 << 5;
        /// A full cube.
        const FULL = Self::DOWN.bits()
            | Self::UP.bits()
            | Self::NORTH.bits()
            | Self::SOUTH.bits()
            | Self::WEST.bits()
            | Self::EAST.bits();
    }
}

impl OcclusionShape {
    /// The face pointing towards `dir`.
    #[must_use]
    pub const fn face(dir: Direction) -> Self {
        Self::from_bits_truncate(1 << dir as u8)
    }

    /// Whether the face pointing towards `dir` is sealed.
    #[must_use]
    pub const fn covers(self, dir: Direction) -> bool {
        self.contains(Self::face(dir))
    }
}

/// The light relevant properties of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellState {
    /// How much light the cell absorbs (0-15).
    pub light_block: u8,
    /// Light emitted by the cell (0-15).
    pub emission: u8,
    /// The faces sealed by the cell's geometry.
    pub occlusion: OcclusionShape,
}

impl CellState {
    /// Empty space.
    pub const AIR: Self = Self {
        light_block: 0,
        emission: 0,
        occlusion: OcclusionShape::empty(),
    };

    /// A fully opaque cube. Also what unloaded cells read as.
    pub const OPAQUE: Self = Self {
        light_block: 15,
        emission: 0,
        occlusion: OcclusionShape::FULL,
    };

    /// A transparent cell that emits light, like a torch.
    #[must_use]
    pub const fn emitter(emission: u8) -> Self {
        Self {
            light_block: 0,
            emission,
            occlusion: OcclusionShape::empty(),
        }
    }

    /// A cell that absorbs `light_block` without sealing any face, like water or leaves.
    #[must_use]
    pub const fn translucent(light_block: u8) -> Self {
        Self {
            light_block,
            emission: 0,
            occlusion: OcclusionShape::empty(),
        }
    }

    /// Whether the occlusion shape seals nothing.
    #[must_use]
    pub const fn is_empty_shape(&self) -> bool {
        self.occlusion.is_empty()
    }

    /// The amount subtracted from light entering this cell. Never below 1.
    #[must_use]
    pub const fn opacity(&self) -> u8 {
        if self.light_block > 1 {
            self.light_block
        } else {
            1
        }
    }
}

/// Whether the shared face between `from` and its neighbor `to` in direction `dir`
/// is sealed by either cell.
#[must_use]
pub const fn shape_occludes(from: &CellState, to: &CellState, dir: Direction) -> bool {
    from.occlusion.covers(dir) || to.occlusion.covers(dir.opposite())
}

/// Whether sky light falling from `top` into the cell `bottom` below it is stopped.
#[must_use]
pub const fn is_edge_occluded(top: &CellState, bottom: &CellState) -> bool {
    bottom.light_block != 0 || shape_occludes(top, bottom, Direction::Down)
}

/// Read access to the voxel world.
///
/// Implementations must not call back into the light engine.
pub trait LightChunkAccess {
    /// The state of the cell at `pos`, or `None` if it is not loaded.
    ///
    /// The engine treats `None` as [`CellState::OPAQUE`].
    fn cell_state(&self, pos: BlockPos) -> Option<CellState>;

    /// Whether the section holds only air. Unloaded sections count as empty.
    fn is_section_empty(&self, section: SectionPos) -> bool;

    /// The state of the cell at `pos`, with unloaded cells read as opaque.
    fn cell_state_or_opaque(&self, pos: BlockPos) -> CellState {
        self.cell_state(pos).unwrap_or(CellState::OPAQUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faces_follow_direction_ordinals() {
        assert_eq!(OcclusionShape::face(Direction::Down), OcclusionShape::DOWN);
        assert_eq!(OcclusionShape::face(Direction::East), OcclusionShape::EAST);
        assert!(OcclusionShape::FULL.covers(Direction::North));
        assert!(!OcclusionShape::UP.covers(Direction::Down));
    }

    #[test]
    fn test_opacity_is_at_least_one() {
        assert_eq!(CellState::AIR.opacity(), 1);
        assert_eq!(CellState::translucent(3).opacity(), 3);
        assert_eq!(CellState::OPAQUE.opacity(), 15);
    }

    #[test]
    fn test_slab_seals_only_its_face() {
        let bottom_slab = CellState {
            light_block: 0,
            emission: 0,
            occlusion: OcclusionShape::DOWN,
        };
        assert!(shape_occludes(&bottom_slab, &CellState::AIR, Direction::Down));
        assert!(!shape_occludes(&bottom_slab, &CellState::AIR, Direction::Up));
        assert!(shape_occludes(&CellState::AIR, &bottom_slab, Direction::Up));
        assert!(is_edge_occluded(&bottom_slab, &CellState::AIR));
        assert!(!is_edge_occluded(&CellState::AIR, &bottom_slab));
    }
}

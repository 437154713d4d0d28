//! Sky light source tracking for chunk columns.

use steel_utils::{BlockPos, ChunkPos, SectionPos, codec::BitStorage};

use crate::{
    config::LightConfig,
    world::{CellState, LightChunkAccess, is_edge_occluded},
};

/// Tracks the lowest y where sky light enters each column of a chunk.
///
/// Every cell at or above that y in its column is a sky source at level 15.
///
/// # Storage Format
///
/// Heights are stored relative to one below the world floor, `bits_for(height + 2)`
/// bits wide, x-major (`index = x + z * 16`). A stored 0 means the column is open
/// all the way down and reads as [`ChunkSkyLightSources::NEGATIVE_INFINITY`].
#[derive(Debug, Clone)]
pub struct ChunkSkyLightSources {
    chunk: ChunkPos,
    /// One below the lowest block of the world.
    min_y: i32,
    /// One past the highest block of the world.
    max_y: i32,
    min_section: i32,
    max_section: i32,
    heightmap: BitStorage,
}

#[inline]
const fn index(x: usize, z: usize) -> usize {
    x + z * 16
}

impl ChunkSkyLightSources {
    /// Marks a column open to below the world floor.
    pub const NEGATIVE_INFINITY: i32 = i32::MIN;

    /// Creates a tracker for `chunk` with every column open.
    #[must_use]
    pub fn new(chunk: ChunkPos, config: &LightConfig) -> Self {
        let min_y = config.min_y - 1;
        let max_y = config.min_y + config.height;
        let bits = BitStorage::bits_for((max_y + 1 - min_y) as u32);
        Self {
            chunk,
            min_y,
            max_y,
            min_section: config.min_section(),
            max_section: config.max_section(),
            heightmap: BitStorage::new(bits, 256),
        }
    }

    /// The chunk this tracker covers.
    #[must_use]
    pub fn chunk(&self) -> ChunkPos {
        self.chunk
    }

    /// Rebuilds every column by scanning down from the highest non-empty section.
    pub fn fill_from<W: LightChunkAccess + ?Sized>(&mut self, world: &W) {
        let ChunkPos(pos) = self.chunk;
        let top = (self.min_section..self.max_section)
            .rev()
            .find(|&y| !world.is_section_empty(SectionPos::new(pos.x, y, pos.y)));
        let Some(top) = top else {
            self.heightmap.fill(0);
            return;
        };

        for z in 0..16 {
            for x in 0..16 {
                let y = self.find_lowest_source_y(world, top, x, z).max(self.min_y);
                self.set(index(x, z), y);
            }
        }
    }

    fn find_lowest_source_y<W: LightChunkAccess + ?Sized>(
        &self,
        world: &W,
        top_section: i32,
        x: usize,
        z: usize,
    ) -> i32 {
        let ChunkPos(pos) = self.chunk;
        let mut above_y = (top_section + 1) << 4;
        let mut above_state = CellState::AIR;
        for section_y in (self.min_section..=top_section).rev() {
            if world.is_section_empty(SectionPos::new(pos.x, section_y, pos.y)) {
                above_state = CellState::AIR;
                above_y = section_y << 4;
                continue;
            }
            for _ in 0..16 {
                let below_y = above_y - 1;
                let below_state = self.cell(world, x, below_y, z);
                if is_edge_occluded(&above_state, &below_state) {
                    return above_y;
                }
                above_state = below_state;
                above_y = below_y;
            }
        }
        self.min_y
    }

    /// Re-derives the column at local `x`, `z` after the cell at `y` changed.
    ///
    /// Only the edges above and below the cell can move the source boundary.
    /// Returns whether the lowest source of the column changed.
    pub fn update<W: LightChunkAccess + ?Sized>(
        &mut self,
        world: &W,
        x: usize,
        y: i32,
        z: usize,
    ) -> bool {
        let index = index(x, z);
        let old_lowest = self.get(index);
        if y + 1 < old_lowest {
            return false;
        }

        let above = self.cell(world, x, y + 1, z);
        let state = self.cell(world, x, y, z);
        if self.update_edge(world, index, old_lowest, x, z, y + 1, &above, &state) {
            return true;
        }
        let below = self.cell(world, x, y - 1, z);
        self.update_edge(world, index, old_lowest, x, z, y, &state, &below)
    }

    #[allow(clippy::too_many_arguments)]
    fn update_edge<W: LightChunkAccess + ?Sized>(
        &mut self,
        world: &W,
        index: usize,
        old_lowest: i32,
        x: usize,
        z: usize,
        top_y: i32,
        top: &CellState,
        bottom: &CellState,
    ) -> bool {
        if is_edge_occluded(top, bottom) {
            if top_y > old_lowest {
                self.set(index, top_y);
                return true;
            }
        } else if top_y == old_lowest {
            let lowest = self.find_lowest_source_below(world, x, z, top_y - 1, *bottom);
            self.set(index, lowest);
            return true;
        }
        false
    }

    fn find_lowest_source_below<W: LightChunkAccess + ?Sized>(
        &self,
        world: &W,
        x: usize,
        z: usize,
        y: i32,
        state: CellState,
    ) -> i32 {
        let mut above_y = y;
        let mut above_state = state;
        while above_y - 1 > self.min_y {
            let below_state = self.cell(world, x, above_y - 1, z);
            if is_edge_occluded(&above_state, &below_state) {
                return above_y;
            }
            above_state = below_state;
            above_y -= 1;
        }
        self.min_y
    }

    /// Cells outside the world's height are open air.
    fn cell<W: LightChunkAccess + ?Sized>(&self, world: &W, x: usize, y: i32, z: usize) -> CellState {
        if y <= self.min_y || y >= self.max_y {
            return CellState::AIR;
        }
        world.cell_state_or_opaque(BlockPos::new(
            self.chunk.min_block_x() + x as i32,
            y,
            self.chunk.min_block_z() + z as i32,
        ))
    }

    /// The lowest source y of a column, or [`Self::NEGATIVE_INFINITY`].
    ///
    /// # Panics
    /// If `x` or `z` is outside `0..16`.
    #[inline]
    #[must_use]
    pub fn get_lowest_source_y(&self, x: usize, z: usize) -> i32 {
        assert!(x < 16 && z < 16, "column coordinates must be 0-15");
        self.extend_sources_below_world(self.get(index(x, z)))
    }

    /// The highest lowest source y over all 256 columns.
    #[must_use]
    pub fn get_highest_lowest_source_y(&self) -> i32 {
        let highest = (0..256).map(|i| self.get(i)).max().unwrap_or(self.min_y);
        self.extend_sources_below_world(highest)
    }

    /// Whether the cell at local `x`, `z` and world `y` is a sky source.
    #[inline]
    #[must_use]
    pub fn is_source(&self, x: usize, y: i32, z: usize) -> bool {
        y >= self.get_lowest_source_y(x, z)
    }

    fn set(&mut self, index: usize, y: i32) {
        self.heightmap.set(index, (y - self.min_y) as u32);
    }

    fn get(&self, index: usize) -> i32 {
        self.heightmap.get(index) as i32 + self.min_y
    }

    fn extend_sources_below_world(&self, y: i32) -> i32 {
        if y == self.min_y {
            Self::NEGATIVE_INFINITY
        } else {
            y
        }
    }
}

//! A generated world of rolling stone hills for driving the light engine.

use rustc_hash::FxHashMap;
use steel_light::{CellState, LightChunkAccess, LightConfig};
use steel_utils::{BlockPos, ChunkPos, SectionPos};

/// Square area of loaded columns with a heightmap terrain and sparse edits on top.
pub struct DemoWorld {
    radius: i32,
    min_y: i32,
    max_y: i32,
    heights: FxHashMap<ChunkPos, [i32; 256]>,
    edits: FxHashMap<BlockPos, CellState>,
    edited_sections: FxHashMap<SectionPos, usize>,
}

impl DemoWorld {
    /// Generates every column within `radius` chunks of the origin.
    #[must_use]
    pub fn generate(config: &LightConfig, radius: i32) -> Self {
        let mut heights = FxHashMap::default();
        for column in Self::square(radius) {
            let mut column_heights = [0; 256];
            for (i, height) in column_heights.iter_mut().enumerate() {
                let x = column.min_block_x() + (i & 15) as i32;
                let z = column.min_block_z() + (i >> 4) as i32;
                *height = terrain_height(x, z);
            }
            heights.insert(column, column_heights);
        }
        Self {
            radius,
            min_y: config.min_y,
            max_y: config.min_y + config.height,
            heights,
            edits: FxHashMap::default(),
            edited_sections: FxHashMap::default(),
        }
    }

    /// The loaded columns.
    #[must_use]
    pub fn columns(&self) -> Vec<ChunkPos> {
        Self::square(self.radius).collect()
    }

    fn square(radius: i32) -> impl Iterator<Item = ChunkPos> {
        (-radius..=radius).flat_map(move |x| (-radius..=radius).map(move |z| ChunkPos::new(x, z)))
    }

    /// First air cell above the terrain at the given column.
    #[must_use]
    pub fn surface(&self, x: i32, z: i32) -> Option<BlockPos> {
        let column = ChunkPos::from_block(BlockPos::new(x, 0, z));
        let heights = self.heights.get(&column)?;
        let i = ((z - column.min_block_z()) << 4 | (x - column.min_block_x())) as usize;
        Some(BlockPos::new(x, heights[i], z))
    }

    /// Overrides a cell. Returns false if its column is not loaded.
    pub fn set(&mut self, pos: BlockPos, state: CellState) -> bool {
        if !self.heights.contains_key(&ChunkPos::from_block(pos)) {
            return false;
        }
        if self.edits.insert(pos, state).is_none() {
            *self.edited_sections.entry(pos.section()).or_default() += 1;
        }
        true
    }

    fn terrain(&self, pos: BlockPos) -> Option<CellState> {
        let BlockPos(v) = pos;
        if v.y < self.min_y || v.y >= self.max_y {
            return Some(CellState::AIR);
        }
        let surface = self.surface(v.x, v.z)?;
        Some(if v.y < surface.0.y {
            CellState::OPAQUE
        } else {
            CellState::AIR
        })
    }
}

impl LightChunkAccess for DemoWorld {
    fn cell_state(&self, pos: BlockPos) -> Option<CellState> {
        if !self.heights.contains_key(&ChunkPos::from_block(pos)) {
            return None;
        }
        match self.edits.get(&pos) {
            Some(state) => Some(*state),
            None => self.terrain(pos),
        }
    }

    fn is_section_empty(&self, section: SectionPos) -> bool {
        let Some(heights) = self.heights.get(&section.chunk()) else {
            return true;
        };
        if self.edited_sections.contains_key(&section) {
            return false;
        }
        let bottom = section.origin().0.y;
        if bottom < self.min_y || bottom >= self.max_y {
            return true;
        }
        heights.iter().all(|&height| height <= bottom)
    }
}

/// Gentle hills between y 58 and 73.
fn terrain_height(x: i32, z: i32) -> i32 {
    let ridge = ((x.rem_euclid(48) - 24).abs() + (z.rem_euclid(32) - 16).abs()) / 4;
    let bumps = (x.wrapping_mul(73_856_093) ^ z.wrapping_mul(19_349_663)).rem_euclid(3);
    58 + ridge.min(12) + bumps
}

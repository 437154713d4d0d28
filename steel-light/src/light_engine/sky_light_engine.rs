//! Sky light engine with empty section propagation optimization.
//!
//! Every cell at or above its column's lowest source is a sky source at level 15.
//! Sources are maintained per column through [`ChunkSkyLightSources`], so moving the
//! source boundary only touches the cells between the old and the new boundary.

use rustc_hash::FxHashMap;
use steel_utils::{BlockPos, ChunkPos, SectionPos, types::section_relative};

use crate::{
    MAX_LEVEL,
    config::LightConfig,
    sky_light_sources::ChunkSkyLightSources,
    storage::LightLayer,
    world::LightChunkAccess,
};

use super::{
    base::{LightEngine, LightPropagator, PropagationGraph},
    direction::Direction,
    queue_entry::QueueEntry,
};

/// Sky light engine.
pub type SkyLightEngine = LightEngine<SkyLightPropagator>;

const REMOVE_TOP_SKY_SOURCE_ENTRY: QueueEntry = QueueEntry::decrease_all_directions(MAX_LEVEL);
const REMOVE_SKY_SOURCE_ENTRY: QueueEntry =
    QueueEntry::decrease_skip_one_direction(MAX_LEVEL, Direction::Up);
const ADD_SKY_SOURCE_ENTRY: QueueEntry =
    QueueEntry::increase_skip_one_direction(MAX_LEVEL, false, Direction::Up);

/// Sources are the cells at or above their column's lowest source.
pub struct SkyLightPropagator {
    config: LightConfig,
    /// Source heights of every loaded column, keyed by packed [`ChunkPos`].
    sources: FxHashMap<i64, ChunkSkyLightSources>,
}

impl SkyLightPropagator {
    /// Creates a propagator without any loaded column.
    #[must_use]
    pub fn new(config: &LightConfig) -> Self {
        Self {
            config: config.clone(),
            sources: FxHashMap::default(),
        }
    }

    /// The source heights of a loaded column.
    #[must_use]
    pub fn sources(&self, column: ChunkPos) -> Option<&ChunkSkyLightSources> {
        self.sources.get(&column.as_i64())
    }

    /// The lowest source y at block `x`, `z`, if the column is lit and loaded.
    fn lowest_source_y(&self, graph: &PropagationGraph, x: i32, z: i32) -> Option<i32> {
        let column = ChunkPos::new(x >> 4, z >> 4).as_i64();
        if !graph.storage().is_light_enabled(column) {
            return None;
        }
        self.sources
            .get(&column)
            .map(|sources| sources.get_lowest_source_y(section_relative(x), section_relative(z)))
    }

    fn update_sources_in_column(graph: &mut PropagationGraph, x: i32, z: i32, lowest: i32) {
        Self::remove_sources_below(graph, x, z, lowest);
        Self::add_sources_above(graph, x, z, lowest);
    }

    /// Darkens former sources below `lowest`, down to the first cell that was not one.
    fn remove_sources_below(graph: &mut PropagationGraph, x: i32, z: i32, lowest: i32) {
        let bottom_y = graph.storage().min_light_section() << 4;
        if lowest <= bottom_y {
            return;
        }
        let mut y = lowest - 1;
        while y >= bottom_y {
            let section = SectionPos::pack(x >> 4, y >> 4, z >> 4);
            if !graph.storage().storing_light_for_section(section) {
                y = ((y >> 4) << 4) - 1;
                continue;
            }
            let pos = BlockPos::pack(x, y, z);
            if graph.storage().get_stored_level(pos) != MAX_LEVEL {
                return;
            }
            graph.storage_mut().set_stored_level(pos, 0);
            let entry = if y == lowest - 1 {
                REMOVE_TOP_SKY_SOURCE_ENTRY
            } else {
                REMOVE_SKY_SOURCE_ENTRY
            };
            graph.enqueue_decrease(pos, entry);
            y -= 1;
        }
    }

    /// Lights new sources from `lowest` up, until the first cell that already was one.
    fn add_sources_above(graph: &mut PropagationGraph, x: i32, z: i32, lowest: i32) {
        let top_y = (graph.storage().max_light_section() << 4) + 15;
        let mut y = lowest.max(graph.storage().min_light_section() << 4);
        while y <= top_y {
            let section = SectionPos::pack(x >> 4, y >> 4, z >> 4);
            if !graph.storage().storing_light_for_section(section) {
                y = (y | 15) + 1;
                continue;
            }
            let pos = BlockPos::pack(x, y, z);
            if graph.storage().get_stored_level(pos) == MAX_LEVEL {
                return;
            }
            graph.storage_mut().set_stored_level(pos, MAX_LEVEL);
            graph.enqueue_increase(pos, ADD_SKY_SOURCE_ENTRY);
            y += 1;
        }
    }

    /// Enqueues `dir` propagation from the sources of column `x`, `z` in
    /// `from_y..to_y` whose cell and neighbor both have storage.
    fn enqueue_source_edges(
        graph: &mut PropagationGraph,
        x: i32,
        z: i32,
        dir: Direction,
        from_y: i32,
        to_y: i32,
    ) {
        let (dx, _, dz) = dir.offset();
        let mut y = from_y;
        while y < to_y {
            let here = SectionPos::pack(x >> 4, y >> 4, z >> 4);
            let there = SectionPos::pack((x + dx) >> 4, y >> 4, (z + dz) >> 4);
            if !graph.storage().storing_light_for_section(here)
                || !graph.storage().storing_light_for_section(there)
            {
                y = (y | 15) + 1;
                continue;
            }
            graph.enqueue_increase(
                BlockPos::pack(x, y, z),
                QueueEntry::increase_only_one_direction(MAX_LEVEL, false, dir),
            );
            y += 1;
        }
    }
}

impl LightPropagator for SkyLightPropagator {
    const LAYER: LightLayer = LightLayer::Sky;
    const EMISSIVE: bool = false;

    fn check_node<W: LightChunkAccess + ?Sized>(
        &mut self,
        graph: &mut PropagationGraph,
        world: &W,
        pos: i64,
    ) {
        let (x, y, z) = (BlockPos::x(pos), BlockPos::y(pos), BlockPos::z(pos));
        let column = ChunkPos::new(x >> 4, z >> 4).as_i64();
        if graph.storage().is_light_enabled(column) {
            if let Some(sources) = self.sources.get_mut(&column) {
                sources.update(world, section_relative(x), y, section_relative(z));
            }
        }

        let lowest = self.lowest_source_y(graph, x, z);
        if let Some(lowest) = lowest {
            Self::update_sources_in_column(graph, x, z, lowest);
        }
        if !graph
            .storage()
            .storing_light_for_section(SectionPos::block_to_section(pos))
        {
            return;
        }

        let level = graph.storage().get_stored_level(pos);
        if lowest.is_some_and(|lowest| y >= lowest) {
            if level != MAX_LEVEL {
                graph.storage_mut().set_stored_level(pos, MAX_LEVEL);
            }
            graph.enqueue_decrease(pos, REMOVE_SKY_SOURCE_ENTRY);
            graph.enqueue_increase(pos, ADD_SKY_SOURCE_ENTRY);
        } else if level > 0 {
            graph.storage_mut().set_stored_level(pos, 0);
            graph.enqueue_decrease(pos, QueueEntry::decrease_all_directions(level));
        } else {
            graph.enqueue_decrease(pos, QueueEntry::PULL_LIGHT_IN);
        }
    }

    fn on_fresh_section<W: LightChunkAccess + ?Sized>(
        &mut self,
        graph: &mut PropagationGraph,
        _world: &W,
        section: i64,
    ) {
        graph.enqueue_section_border_checks(section);

        // the layer was copied from the section above, so it may hold former
        // sources and derived light that nothing supports here
        let origin = SectionPos::of_long(section).origin();
        for z in 0..16 {
            for x in 0..16 {
                let (bx, bz) = (origin.0.x + x, origin.0.z + z);
                if let Some(lowest) = self.lowest_source_y(graph, bx, bz) {
                    Self::update_sources_in_column(graph, bx, bz, lowest);
                }
            }
        }
        // a dim uniform copy is as unsupported as a mixed one
        let needs_interior_checks = graph
            .storage()
            .updating()
            .layer(section)
            .is_some_and(|layer| {
                layer
                    .uniform_level()
                    .is_none_or(|level| level > 0 && level < MAX_LEVEL)
            });
        if needs_interior_checks {
            for y in 0..16 {
                for z in 0..16 {
                    for x in 0..16 {
                        let pos = origin.offset(x, y, z).as_long();
                        let level = graph.storage().get_stored_level(pos);
                        if level > 0 && level < MAX_LEVEL {
                            graph.enqueue_check(pos);
                        }
                    }
                }
            }
        }
        graph.enqueue_section_border_increases(section);
    }

    fn propagate_light_sources<W: LightChunkAccess + ?Sized>(
        &mut self,
        graph: &mut PropagationGraph,
        world: &W,
        column: ChunkPos,
    ) {
        let key = column.as_i64();
        graph.storage_mut().set_light_enabled(key, true);
        let config = &self.config;
        let sources = self.sources.entry(key).or_insert_with(|| {
            let mut sources = ChunkSkyLightSources::new(column, config);
            sources.fill_from(world);
            sources
        });

        let min_y = graph.storage().min_light_section() << 4;
        let max_section = graph.storage().max_light_section();
        let top_y = (max_section << 4) + 16;
        let ChunkPos(chunk) = column;

        // sections entirely above every column's lowest source are filled in bulk
        let highest = sources.get_highest_lowest_source_y().max(min_y);
        let bulk_section = (highest + 15) >> 4;
        for section_y in bulk_section..=max_section {
            graph
                .storage_mut()
                .fill_section(SectionPos::pack(chunk.x, section_y, chunk.y), MAX_LEVEL);
        }
        let bulk_y = bulk_section << 4;

        let mut lowest = [0i32; 256];
        for z in 0..16 {
            for x in 0..16 {
                let column_lowest = sources.get_lowest_source_y(x, z);
                lowest[x + z * 16] = column_lowest;
                let (bx, bz) = (column.min_block_x() + x as i32, column.min_block_z() + z as i32);
                Self::remove_sources_below(graph, bx, bz, column_lowest);
                for y in column_lowest.max(min_y)..bulk_y {
                    let pos = BlockPos::pack(bx, y, bz);
                    if graph
                        .storage()
                        .storing_light_for_section(SectionPos::block_to_section(pos))
                    {
                        graph.storage_mut().set_stored_level(pos, MAX_LEVEL);
                    }
                }
            }
        }

        // only sources next to a non-source have anywhere to propagate
        for z in 0..16 {
            for x in 0..16 {
                let column_lowest = lowest[x + z * 16];
                let from_y = column_lowest.max(min_y);
                let (bx, bz) = (column.min_block_x() + x as i32, column.min_block_z() + z as i32);
                if column_lowest > min_y {
                    let pos = BlockPos::pack(bx, column_lowest, bz);
                    if graph
                        .storage()
                        .storing_light_for_section(SectionPos::block_to_section(pos))
                    {
                        graph.enqueue_increase(
                            pos,
                            QueueEntry::increase_only_one_direction(
                                MAX_LEVEL,
                                false,
                                Direction::Down,
                            ),
                        );
                    }
                }
                for dir in Direction::HORIZONTAL {
                    let (dx, _, dz) = dir.offset();
                    let (nx, nz) = (bx + dx, bz + dz);
                    let neighbor_lowest = if (nx >> 4, nz >> 4) == (chunk.x, chunk.y) {
                        Some(lowest[section_relative(nx) + section_relative(nz) * 16])
                    } else {
                        self.lowest_source_y(graph, nx, nz)
                    };
                    let to_y = neighbor_lowest.map_or(top_y, |neighbor| neighbor.min(top_y));
                    Self::enqueue_source_edges(graph, bx, bz, dir, from_y, to_y);
                }
            }
        }
        log::trace!("Seeded sky light sources of column {column:?}, bulk from y {bulk_y}");
    }

    fn on_column_loaded<W: LightChunkAccess + ?Sized>(&mut self, world: &W, column: ChunkPos) {
        let mut sources = ChunkSkyLightSources::new(column, &self.config);
        sources.fill_from(world);
        self.sources.insert(column.as_i64(), sources);
    }

    fn on_column_unloaded(&mut self, column: ChunkPos) {
        self.sources.remove(&column.as_i64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data_layer::DataLayer, world::CellState};

    #[derive(Default)]
    struct Cells(FxHashMap<BlockPos, CellState>);

    impl LightChunkAccess for Cells {
        fn cell_state(&self, pos: BlockPos) -> Option<CellState> {
            Some(self.0.get(&pos).copied().unwrap_or(CellState::AIR))
        }

        fn is_section_empty(&self, section: SectionPos) -> bool {
            !self.0.keys().any(|pos| pos.section() == section)
        }
    }

    fn lit_engine(world: &Cells) -> SkyLightEngine {
        let config = LightConfig::default();
        let mut engine = SkyLightEngine::new(&config, SkyLightPropagator::new(&config));
        engine.update_section_status(SectionPos::new(0, 4, 0), false);
        engine.propagate_light_sources(world, ChunkPos::new(0, 0));
        engine.run_light_updates(world, usize::MAX);
        engine
    }

    #[test]
    fn test_open_column_is_full_bright() {
        let mut world = Cells::default();
        world.0.insert(BlockPos::new(12, 64, 12), CellState::OPAQUE);
        let engine = lit_engine(&world);

        assert_eq!(engine.get_light_value(BlockPos::new(3, 70, 3)), 15);
        assert_eq!(engine.get_light_value(BlockPos::new(3, 200, 3)), 15);
        assert_eq!(engine.get_light_value(BlockPos::new(12, 65, 12)), 15);
        // under the block, lit sideways
        assert_eq!(engine.get_light_value(BlockPos::new(12, 63, 12)), 14);
        assert_eq!(
            engine
                .propagator()
                .sources(ChunkPos::new(0, 0))
                .map(|sources| sources.get_lowest_source_y(12, 12)),
            Some(65)
        );
    }

    #[test]
    fn test_roof_shades_and_uncovers() {
        let mut world = Cells::default();
        world.0.insert(BlockPos::new(12, 64, 12), CellState::OPAQUE);
        let mut engine = lit_engine(&world);

        let roof: Vec<BlockPos> = (-1..=1)
            .flat_map(|x| (-1..=1).map(move |z| BlockPos::new(4 + x, 70, 4 + z)))
            .collect();
        for &pos in &roof {
            world.0.insert(pos, CellState::OPAQUE);
            engine.check_block(pos);
        }
        engine.run_light_updates(&world, usize::MAX);
        assert_eq!(engine.get_light_value(BlockPos::new(4, 71, 4)), 15);
        assert_eq!(engine.get_light_value(BlockPos::new(4, 70, 4)), 0);
        assert_eq!(engine.get_light_value(BlockPos::new(4, 69, 4)), 13);
        assert_eq!(engine.get_light_value(BlockPos::new(5, 69, 4)), 14);

        for &pos in &roof {
            world.0.remove(&pos);
            engine.check_block(pos);
        }
        engine.run_light_updates(&world, usize::MAX);
        for y in [70, 69, 65] {
            assert_eq!(engine.get_light_value(BlockPos::new(4, y, 4)), 15);
        }
        assert!(!engine.has_light_work());
    }

    #[test]
    fn test_section_copied_from_a_dim_uniform_layer_is_rederived() {
        let mut world = Cells::default();
        for x in 0..16 {
            for z in 0..16 {
                world.0.insert(BlockPos::new(x, 100, z), CellState::OPAQUE);
            }
        }
        let config = LightConfig::default();
        let column = ChunkPos::new(0, 0);
        let mut engine = SkyLightEngine::new(&config, SkyLightPropagator::new(&config));
        engine.update_section_status(SectionPos::new(0, 6, 0), false);
        engine.propagate_light_sources(&world, column);
        engine.run_light_updates(&world, usize::MAX);

        // persisted light under the roof, stored through its upper neighbor only
        engine.retain_data(column, true);
        engine.queue_section_data(SectionPos::new(0, 2, 0), Some(DataLayer::new_filled(7)));
        engine.update_section_status(SectionPos::new(0, 3, 0), false);
        while engine.has_light_work() {
            engine.run_light_updates(&world, usize::MAX);
        }
        assert_eq!(engine.get_light_value(BlockPos::new(8, 40, 8)), 7);

        // the sections below start as copies of that layer
        engine.update_section_status(SectionPos::new(0, 0, 0), false);
        while engine.has_light_work() {
            engine.run_light_updates(&world, usize::MAX);
        }
        assert_eq!(engine.get_light_value(BlockPos::new(8, 31, 8)), 6);
        assert_eq!(engine.get_light_value(BlockPos::new(8, 28, 8)), 3);
        assert_eq!(engine.get_light_value(BlockPos::new(8, 20, 8)), 0);
        assert_eq!(engine.get_light_value(BlockPos::new(8, 5, 8)), 0);
    }

    #[test]
    fn test_unlit_column_stays_dark() {
        let config = LightConfig::default();
        let mut engine = SkyLightEngine::new(&config, SkyLightPropagator::new(&config));
        let mut world = Cells::default();
        world.0.insert(BlockPos::new(0, 0, 0), CellState::OPAQUE);
        engine.update_section_status(SectionPos::new(0, 0, 0), false);
        engine.check_block(BlockPos::new(0, 1, 0));
        engine.run_light_updates(&world, usize::MAX);
        assert_eq!(engine.get_light_value(BlockPos::new(0, 1, 0)), 0);
        assert_eq!(engine.get_light_value(BlockPos::new(0, 300, 0)), 0);
    }
}

//! Both light layers of a level behind one front.

use std::sync::Arc;

use steel_utils::{BlockPos, ChunkPos, SectionPos};

use crate::{
    config::LightConfig,
    data_layer::DataLayer,
    storage::{LightLayer, LightSectionReader},
    world::LightChunkAccess,
};

use super::{
    block_light_engine::{BlockLightEngine, BlockLightPropagator},
    sky_light_engine::{SkyLightEngine, SkyLightPropagator},
};

/// Read handles for the published data of both layers.
#[derive(Clone)]
pub struct LevelLightReader {
    block: Option<LightSectionReader>,
    sky: Option<LightSectionReader>,
}

impl LevelLightReader {
    /// The published value of one layer, 0 if the level lacks that layer.
    #[must_use]
    pub fn light_value(&self, layer: LightLayer, pos: BlockPos) -> u8 {
        let reader = match layer {
            LightLayer::Block => &self.block,
            LightLayer::Sky => &self.sky,
        };
        reader.as_ref().map_or(0, |reader| reader.light_value(pos))
    }

    /// Combined brightness with the sky dimmed by `sky_darken`.
    #[must_use]
    pub fn raw_brightness(&self, pos: BlockPos, sky_darken: u8) -> u8 {
        let sky = self
            .light_value(LightLayer::Sky, pos)
            .saturating_sub(sky_darken);
        sky.max(self.light_value(LightLayer::Block, pos))
    }
}

/// Drives the block and sky engines of one level.
///
/// A level without a sky (or, unusually, without block light) simply has no engine
/// for that layer; every call skips it.
pub struct LevelLightEngine {
    block_engine: Option<BlockLightEngine>,
    sky_engine: Option<SkyLightEngine>,
}

impl LevelLightEngine {
    /// Creates the engines enabled in `config`.
    #[must_use]
    pub fn new(config: &LightConfig) -> Self {
        Self {
            block_engine: config
                .has_block_light
                .then(|| BlockLightEngine::new(config, BlockLightPropagator)),
            sky_engine: config
                .has_sky_light
                .then(|| SkyLightEngine::new(config, SkyLightPropagator::new(config))),
        }
    }

    /// The block light engine, if the level has block light.
    #[must_use]
    pub fn block_engine(&self) -> Option<&BlockLightEngine> {
        self.block_engine.as_ref()
    }

    /// The sky light engine, if the level has a sky.
    #[must_use]
    pub fn sky_engine(&self) -> Option<&SkyLightEngine> {
        self.sky_engine.as_ref()
    }

    /// Queues a changed cell for both layers.
    pub fn check_block(&mut self, pos: BlockPos) {
        if let Some(engine) = &mut self.block_engine {
            engine.check_block(pos);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.check_block(pos);
        }
    }

    /// Whether either layer has queued work.
    #[must_use]
    pub fn has_light_work(&self) -> bool {
        self.block_engine
            .as_ref()
            .is_some_and(BlockLightEngine::has_light_work)
            || self
                .sky_engine
                .as_ref()
                .is_some_and(SkyLightEngine::has_light_work)
    }

    /// Runs block light, then sky light with what is left of `budget`. Returns the
    /// number of propagation steps done.
    pub fn run_light_updates<W: LightChunkAccess + ?Sized>(
        &mut self,
        world: &W,
        budget: usize,
    ) -> usize {
        let mut remaining = budget;
        if let Some(engine) = &mut self.block_engine {
            remaining = engine.run_light_updates(world, remaining);
        }
        if let Some(engine) = &mut self.sky_engine {
            remaining = engine.run_light_updates(world, remaining);
        }
        budget - remaining
    }

    /// Records whether a section holds blocks.
    pub fn update_section_status(&mut self, section: SectionPos, is_empty: bool) {
        if let Some(engine) = &mut self.block_engine {
            engine.update_section_status(section, is_empty);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.update_section_status(section, is_empty);
        }
    }

    /// Switches light on or off for a column.
    pub fn set_light_enabled(&mut self, column: ChunkPos, enabled: bool) {
        if let Some(engine) = &mut self.block_engine {
            engine.set_light_enabled(column, enabled);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.set_light_enabled(column, enabled);
        }
    }

    /// Seeds every source of a freshly loaded column in both layers.
    pub fn propagate_light_sources<W: LightChunkAccess + ?Sized>(
        &mut self,
        world: &W,
        column: ChunkPos,
    ) {
        if let Some(engine) = &mut self.block_engine {
            engine.propagate_light_sources(world, column);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.propagate_light_sources(world, column);
        }
    }

    /// Tells the engines a column's blocks are available.
    pub fn on_column_loaded<W: LightChunkAccess + ?Sized>(&mut self, world: &W, column: ChunkPos) {
        if let Some(engine) = &mut self.block_engine {
            engine.on_column_loaded(world, column);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.on_column_loaded(world, column);
        }
    }

    /// Tells the engines a column's blocks are gone.
    pub fn on_column_unloaded(&mut self, column: ChunkPos) {
        if let Some(engine) = &mut self.block_engine {
            engine.on_column_unloaded(column);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.on_column_unloaded(column);
        }
    }

    /// Supplies persisted data for one layer of a section.
    pub fn queue_section_data(
        &mut self,
        layer: LightLayer,
        section: SectionPos,
        data: Option<DataLayer>,
    ) {
        match layer {
            LightLayer::Block => {
                if let Some(engine) = &mut self.block_engine {
                    engine.queue_section_data(section, data);
                }
            }
            LightLayer::Sky => {
                if let Some(engine) = &mut self.sky_engine {
                    engine.queue_section_data(section, data);
                }
            }
        }
    }

    /// Keeps queued data of a column around while it is not loaded.
    pub fn retain_data(&mut self, column: ChunkPos, retain: bool) {
        if let Some(engine) = &mut self.block_engine {
            engine.retain_data(column, retain);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.retain_data(column, retain);
        }
    }

    /// The published value of one layer.
    #[must_use]
    pub fn get_light_value(&self, layer: LightLayer, pos: BlockPos) -> u8 {
        match layer {
            LightLayer::Block => self
                .block_engine
                .as_ref()
                .map_or(0, |engine| engine.get_light_value(pos)),
            LightLayer::Sky => self
                .sky_engine
                .as_ref()
                .map_or(0, |engine| engine.get_light_value(pos)),
        }
    }

    /// Combined brightness with the sky dimmed by `sky_darken`.
    #[must_use]
    pub fn get_raw_brightness(&self, pos: BlockPos, sky_darken: u8) -> u8 {
        let sky = self
            .get_light_value(LightLayer::Sky, pos)
            .saturating_sub(sky_darken);
        sky.max(self.get_light_value(LightLayer::Block, pos))
    }

    /// The published data of one layer of a section.
    #[must_use]
    pub fn get_data_layer_data(
        &self,
        layer: LightLayer,
        section: SectionPos,
    ) -> Option<Arc<DataLayer>> {
        match layer {
            LightLayer::Block => self
                .block_engine
                .as_ref()
                .and_then(|engine| engine.get_data_layer_data(section)),
            LightLayer::Sky => self
                .sky_engine
                .as_ref()
                .and_then(|engine| engine.get_data_layer_data(section)),
        }
    }

    /// Read handles that stay valid while the engine keeps running.
    #[must_use]
    pub fn reader(&self) -> LevelLightReader {
        LevelLightReader {
            block: self.block_engine.as_ref().map(BlockLightEngine::reader),
            sky: self.sky_engine.as_ref().map(SkyLightEngine::reader),
        }
    }

    /// Sections of both layers published since the last call, deduplicated.
    pub fn take_changed_sections(&mut self) -> Vec<SectionPos> {
        let mut sections = Vec::new();
        if let Some(engine) = &mut self.block_engine {
            sections.extend(engine.take_changed_sections());
        }
        if let Some(engine) = &mut self.sky_engine {
            sections.extend(engine.take_changed_sections());
        }
        sections.sort_unstable_by_key(|section| section.as_long());
        sections.dedup();
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::CellState;
    use rustc_hash::FxHashMap;

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

    #[test]
    fn test_raw_brightness_combines_layers() {
        let mut engine = LevelLightEngine::new(&LightConfig::default());
        let mut world = Cells::default();
        // a cave: a roof above, a torch inside
        for x in -8..24 {
            for z in -8..24 {
                world.0.insert(BlockPos::new(x, 20, z), CellState::OPAQUE);
            }
        }
        world.0.insert(BlockPos::new(8, 10, 8), CellState::emitter(14));
        engine.update_section_status(SectionPos::new(0, 0, 0), false);
        engine.update_section_status(SectionPos::new(0, 1, 0), false);
        engine.propagate_light_sources(&world, ChunkPos::new(0, 0));
        while engine.has_light_work() {
            engine.run_light_updates(&world, 10_000);
        }

        let inside = BlockPos::new(8, 12, 8);
        assert_eq!(engine.get_light_value(LightLayer::Block, inside), 12);
        assert_eq!(engine.get_raw_brightness(inside, 0), 12);
        let outside = BlockPos::new(8, 25, 8);
        assert_eq!(engine.get_raw_brightness(outside, 0), 15);
        assert_eq!(engine.get_raw_brightness(outside, 11), 4);
        assert_eq!(engine.reader().raw_brightness(outside, 11), 4);
    }

    #[test]
    fn test_work_done_is_reported() {
        let mut engine = LevelLightEngine::new(&LightConfig::default());
        let mut world = Cells::default();
        let torch = BlockPos::new(3, 3, 3);
        world.0.insert(torch, CellState::emitter(4));
        engine.update_section_status(SectionPos::new(0, 0, 0), false);
        engine.check_block(torch);
        assert!(engine.run_light_updates(&world, 1_000_000) > 0);
        assert!(!engine.has_light_work());
        assert_eq!(engine.run_light_updates(&world, 1_000_000), 0);
    }

    #[test]
    fn test_missing_sky_layer_reads_dark() {
        let config = LightConfig {
            has_sky_light: false,
            ..LightConfig::default()
        };
        let engine = LevelLightEngine::new(&config);
        assert!(engine.sky_engine().is_none());
        assert_eq!(
            engine.get_light_value(LightLayer::Sky, BlockPos::new(0, 300, 0)),
            0
        );
        assert!(
            engine
                .get_data_layer_data(LightLayer::Sky, SectionPos::new(0, 0, 0))
                .is_none()
        );
    }
}

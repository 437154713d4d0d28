//! In-memory world shared by the integration tests.

#![allow(dead_code)]

use rustc_hash::FxHashMap;
use steel_light::{
    CellState, LightChunkAccess,
    light_engine::{Direction, LightEngine, LightPropagator},
    world::shape_occludes,
};
use steel_utils::{BlockPos, SectionPos};

/// Sparse cells over an air background, with per-section occupancy counts.
#[derive(Default)]
pub struct TestWorld {
    cells: FxHashMap<BlockPos, CellState>,
    occupancy: FxHashMap<SectionPos, usize>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, pos: BlockPos, state: CellState) {
        if self.cells.insert(pos, state).is_none() {
            *self.occupancy.entry(pos.section()).or_default() += 1;
        }
    }

    pub fn clear(&mut self, pos: BlockPos) {
        if self.cells.remove(&pos).is_some() {
            let section = pos.section();
            if let Some(count) = self.occupancy.get_mut(&section) {
                *count -= 1;
                if *count == 0 {
                    self.occupancy.remove(&section);
                }
            }
        }
    }

    pub fn state(&self, pos: BlockPos) -> CellState {
        self.cells.get(&pos).copied().unwrap_or(CellState::AIR)
    }

    pub fn non_empty_sections(&self) -> Vec<SectionPos> {
        self.occupancy.keys().copied().collect()
    }
}

impl LightChunkAccess for TestWorld {
    fn cell_state(&self, pos: BlockPos) -> Option<CellState> {
        Some(self.state(pos))
    }

    fn is_section_empty(&self, section: SectionPos) -> bool {
        !self.occupancy.contains_key(&section)
    }
}

/// Every cell of a section.
pub fn section_cells(section: SectionPos) -> impl Iterator<Item = BlockPos> {
    let origin = section.origin();
    (0..16).flat_map(move |y| {
        (0..16).flat_map(move |z| (0..16).map(move |x| origin.offset(x, y, z)))
    })
}

/// Runs an engine until it has nothing left to do.
pub fn settle<P: LightPropagator>(engine: &mut LightEngine<P>, world: &TestWorld) {
    let mut rounds = 0;
    while engine.has_light_work() {
        engine.run_light_updates(world, usize::MAX);
        rounds += 1;
        assert!(rounds < 100, "light engine did not settle");
    }
}

/// Asserts that every stored cell of `sections` holds exactly the brightest of its
/// source level and what its stored neighbors can give it.
pub fn assert_fixed_point<P: LightPropagator>(
    engine: &LightEngine<P>,
    world: &TestWorld,
    sections: &[SectionPos],
    source_level: impl Fn(BlockPos) -> u8,
) {
    let storage = engine.graph().storage();
    for &section in sections {
        if !storage.storing_light_for_section(section.as_long()) {
            continue;
        }
        for pos in section_cells(section) {
            let state = world.state(pos);
            let mut expected = source_level(pos);
            for dir in Direction::ALL {
                let from = dir.opposite().relative(pos);
                if !storage.storing_light_for_section(from.section().as_long()) {
                    continue;
                }
                if shape_occludes(&world.state(from), &state, dir) {
                    continue;
                }
                let from_level = storage.get_stored_level(from.as_long());
                expected = expected.max(from_level.saturating_sub(state.opacity()));
            }
            assert_eq!(
                storage.get_stored_level(pos.as_long()),
                expected,
                "light at {pos:?} is not at its fixed point"
            );
        }
    }
}

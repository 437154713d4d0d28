mod common;

use common::{TestWorld, assert_fixed_point, section_cells, settle};
use steel_light::{
    BlockLightEngine, CellState, LightConfig, OcclusionShape,
    light_engine::BlockLightPropagator,
};
use steel_utils::{BlockPos, SectionPos};

fn engine_for(world: &TestWorld) -> BlockLightEngine {
    let mut engine = BlockLightEngine::new(&LightConfig::default(), BlockLightPropagator);
    for section in world.non_empty_sections() {
        engine.update_section_status(section, false);
    }
    engine
}

fn around(center: SectionPos) -> Vec<SectionPos> {
    let mut sections = Vec::new();
    for dx in -1..=1 {
        for dy in -1..=1 {
            for dz in -1..=1 {
                sections.push(SectionPos::new(
                    center.0.x + dx,
                    center.0.y + dy,
                    center.0.z + dz,
                ));
            }
        }
    }
    sections
}

fn manhattan(a: BlockPos, b: BlockPos) -> i32 {
    (a.0.x - b.0.x).abs() + (a.0.y - b.0.y).abs() + (a.0.z - b.0.z).abs()
}

/// Deterministic xorshift so the scenes are reproducible.
struct Scramble(u64);

impl Scramble {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> i32 {
        (self.next() % n) as i32
    }
}

fn random_state(rng: &mut Scramble) -> CellState {
    match rng.below(10) {
        0..=4 => CellState::OPAQUE,
        5 => CellState::translucent(2),
        6 => CellState::emitter(1 + rng.below(15) as u8),
        7 => CellState {
            light_block: 0,
            emission: 0,
            occlusion: OcclusionShape::DOWN,
        },
        8 => CellState {
            light_block: 1,
            emission: 0,
            occlusion: OcclusionShape::NORTH | OcclusionShape::EAST,
        },
        _ => CellState::emitter(14),
    }
}

#[test]
fn point_source_falls_off_with_distance() {
    let mut world = TestWorld::new();
    let torch = BlockPos::new(8, 8, 8);
    world.set(torch, CellState::emitter(15));
    let mut engine = engine_for(&world);
    engine.check_block(torch);
    settle(&mut engine, &world);

    for section in around(SectionPos::new(0, 0, 0)) {
        for pos in section_cells(section) {
            let expected = (15 - manhattan(pos, torch)).max(0) as u8;
            assert_eq!(engine.get_light_value(pos), expected, "at {pos:?}");
        }
    }
}

#[test]
fn random_scene_reaches_fixed_point_and_stays_there_after_edits() {
    let mut rng = Scramble(0x9E37_79B9_7F4A_7C15);
    let mut world = TestWorld::new();
    for _ in 0..1500 {
        let pos = BlockPos::new(rng.below(32), rng.below(32), rng.below(32));
        world.set(pos, random_state(&mut rng));
    }
    let mut engine = engine_for(&world);
    for section in world.non_empty_sections() {
        for pos in section_cells(section) {
            engine.check_block(pos);
        }
    }
    settle(&mut engine, &world);

    let sections: Vec<SectionPos> = (-1..=2)
        .flat_map(|x| (-1..=2).flat_map(move |y| (-1..=2).map(move |z| SectionPos::new(x, y, z))))
        .collect();
    let emission = |world: &TestWorld, pos: BlockPos| world.state(pos).emission;
    assert_fixed_point(&engine, &world, &sections, |pos| emission(&world, pos));

    for _ in 0..200 {
        let pos = BlockPos::new(rng.below(32), rng.below(32), rng.below(32));
        if rng.below(2) == 0 {
            world.clear(pos);
        } else {
            world.set(pos, random_state(&mut rng));
        }
        engine.check_block(pos);
    }
    settle(&mut engine, &world);
    assert_fixed_point(&engine, &world, &sections, |pos| emission(&world, pos));
}

#[test]
fn removing_bright_source_never_publishes_overshoot() {
    let mut world = TestWorld::new();
    let bright = BlockPos::new(4, 8, 8);
    let dim = BlockPos::new(12, 8, 8);
    world.set(bright, CellState::emitter(15));
    world.set(dim, CellState::emitter(5));
    let mut engine = engine_for(&world);
    engine.check_block(bright);
    engine.check_block(dim);
    settle(&mut engine, &world);
    assert_eq!(engine.get_light_value(BlockPos::new(8, 8, 8)), 11);
    engine.take_changed_sections();

    world.clear(bright);
    engine.check_block(bright);
    let final_level = |pos: BlockPos| (5 - manhattan(pos, dim)).max(0) as u8;
    let mut published = false;
    while engine.has_light_work() {
        engine.run_light_updates(&world, 64);
        published |= !engine.take_changed_sections().is_empty();
        if !published {
            continue;
        }
        for section in around(SectionPos::new(0, 0, 0)) {
            for pos in section_cells(section) {
                assert!(
                    engine.get_light_value(pos) <= final_level(pos),
                    "{pos:?} published above what the remaining source gives"
                );
            }
        }
    }
    assert!(published);
    assert_eq!(engine.get_light_value(BlockPos::new(8, 8, 8)), 1);
    assert_eq!(engine.get_light_value(bright), 0);
    assert_eq!(engine.get_light_value(dim), 5);
}

#[test]
fn settled_engine_does_no_more_work() {
    let mut world = TestWorld::new();
    let torch = BlockPos::new(3, 20, -5);
    world.set(torch, CellState::emitter(13));
    world.set(BlockPos::new(4, 20, -5), CellState::OPAQUE);
    let mut engine = engine_for(&world);
    engine.check_block(torch);
    settle(&mut engine, &world);
    engine.take_changed_sections();

    assert!(!engine.has_light_work());
    assert_eq!(engine.run_light_updates(&world, 1000), 1000);
    assert!(engine.take_changed_sections().is_empty());
    assert!(!engine.has_light_work());
}

#[test]
fn small_budgets_reach_the_same_result() {
    let mut world = TestWorld::new();
    for (pos, level) in [
        (BlockPos::new(2, 2, 2), 15),
        (BlockPos::new(13, 9, 4), 9),
        (BlockPos::new(7, 14, 12), 12),
    ] {
        world.set(pos, CellState::emitter(level));
    }
    for z in 0..16 {
        world.set(BlockPos::new(8, 5, z), CellState::OPAQUE);
    }

    let mut whole = engine_for(&world);
    let mut sliced = engine_for(&world);
    for section in world.non_empty_sections() {
        for pos in section_cells(section) {
            whole.check_block(pos);
            sliced.check_block(pos);
        }
    }
    settle(&mut whole, &world);
    let mut calls = 0;
    while sliced.has_light_work() {
        sliced.run_light_updates(&world, 7);
        calls += 1;
    }
    assert!(calls > 1);

    for section in around(SectionPos::new(0, 0, 0)) {
        for pos in section_cells(section) {
            assert_eq!(whole.get_light_value(pos), sliced.get_light_value(pos));
        }
    }
}

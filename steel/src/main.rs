//! # Steel light harness
//!
//! Loads the light config, generates a small hilly world and drives the threaded
//! light engine through a few ticks of edits.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use steel_light::{CellState, LightLayer, ThreadedLevelLightEngine};
use steel_utils::BlockPos;

use crate::demo_world::DemoWorld;

mod demo_world;
mod logging;

const CONFIG_PATH: &str = "config/light_config.json5";
/// Loaded columns extend this many chunks from the origin.
const WORLD_RADIUS: i32 = 2;
const TICKS: u32 = 20;

fn main() -> anyhow::Result<()> {
    logging::init()?;

    let config = steel_light::LightConfig::load_or_create(Path::new(CONFIG_PATH))
        .with_context(|| format!("failed to load {CONFIG_PATH}"))?;
    log::info!(
        "World spans y {} to {} (sky light: {}, block light: {})",
        config.min_y,
        config.min_y + config.height,
        config.has_sky_light,
        config.has_block_light
    );

    let mut world = DemoWorld::generate(&config, WORLD_RADIUS);
    let engine = ThreadedLevelLightEngine::new(&config);
    let reader = engine.reader();

    let start = Instant::now();
    let columns = world.columns();
    for &column in &columns {
        engine.initialize_light(column, false);
    }
    engine.run_update(&world);
    for &column in &columns {
        engine.light_chunk(column, false);
    }
    let mut work = 0;
    while engine.has_work() {
        work += engine.run_update(&world);
    }
    log::info!(
        "Lit {} columns in {:?} ({work} propagation steps)",
        columns.len(),
        start.elapsed()
    );

    for tick in 0..TICKS {
        let span = tracing::info_span!("tick", tick);
        let _entered = span.enter();

        let Some(pos) = edit_site(&world, tick) else {
            continue;
        };
        let state = if tick % 3 == 0 {
            CellState::OPAQUE
        } else {
            CellState::emitter(14)
        };
        world.set(pos, state);
        engine.check_block(pos);
        if tick % 4 == 0 || engine.try_schedule_update() {
            let work = engine.run_update(&world);
            tracing::debug!(work, "ran light update");
        }

        let above = pos.offset(0, 1, 0);
        tracing::info!(
            x = pos.0.x,
            y = pos.0.y,
            z = pos.0.z,
            block = reader.light_value(LightLayer::Block, above),
            sky = reader.light_value(LightLayer::Sky, above),
            brightness = reader.raw_brightness(above, 0),
            "placed cell"
        );
    }

    while engine.has_work() {
        engine.run_update(&world);
    }
    let sample = world
        .surface(0, 0)
        .context("origin column is always loaded")?;
    log::info!(
        "Settled after {TICKS} ticks; surface at the origin reads sky {} block {}",
        reader.light_value(LightLayer::Sky, sample),
        reader.light_value(LightLayer::Block, sample)
    );
    Ok(())
}

/// Surface cell edited on `tick`, stepping across the loaded area.
fn edit_site(world: &DemoWorld, tick: u32) -> Option<BlockPos> {
    let step = tick as i32;
    let x = (step * 7) % 40 - 20;
    let z = (step * 11) % 40 - 20;
    world.surface(x, z)
}

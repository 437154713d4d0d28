//! Block light: light emitted by the cells themselves.

use steel_utils::{BlockPos, ChunkPos, SectionPos};

use crate::{
    storage::LightLayer,
    world::LightChunkAccess,
};

use super::{
    base::{LightEngine, LightPropagator, PropagationGraph},
    queue_entry::QueueEntry,
};

/// Block light engine.
pub type BlockLightEngine = LightEngine<BlockLightPropagator>;

/// Sources are cells with a non-zero emission, at their emission level.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockLightPropagator;

impl BlockLightPropagator {
    /// Enqueues an emission increase for every emitter in a stored section.
    fn enqueue_emitters<W: LightChunkAccess + ?Sized>(
        graph: &mut PropagationGraph,
        world: &W,
        section: SectionPos,
    ) {
        if world.is_section_empty(section)
            || !graph
                .storage()
                .storing_light_for_section(section.as_long())
        {
            return;
        }
        let origin = section.origin();
        for y in 0..16 {
            for z in 0..16 {
                for x in 0..16 {
                    let pos = origin.offset(x, y, z);
                    let state = world.cell_state_or_opaque(pos);
                    if state.emission > 0 {
                        graph.enqueue_increase(
                            pos.as_long(),
                            QueueEntry::increase_from_emission(
                                state.emission,
                                state.is_empty_shape(),
                            ),
                        );
                    }
                }
            }
        }
    }
}

impl LightPropagator for BlockLightPropagator {
    const LAYER: LightLayer = LightLayer::Block;
    const EMISSIVE: bool = true;

    fn check_node<W: LightChunkAccess + ?Sized>(
        &mut self,
        graph: &mut PropagationGraph,
        world: &W,
        pos: i64,
    ) {
        if !graph
            .storage()
            .storing_light_for_section(SectionPos::block_to_section(pos))
        {
            return;
        }
        let state = world.cell_state_or_opaque(BlockPos::of_long(pos));
        let level = graph.storage().get_stored_level(pos);

        if state.emission < level {
            graph.storage_mut().set_stored_level(pos, 0);
            graph.enqueue_decrease(pos, QueueEntry::decrease_all_directions(level));
        } else {
            graph.enqueue_decrease(pos, QueueEntry::PULL_LIGHT_IN);
        }
        if state.emission > 0 {
            graph.enqueue_increase(
                pos,
                QueueEntry::increase_from_emission(state.emission, state.is_empty_shape()),
            );
        }
    }

    fn on_fresh_section<W: LightChunkAccess + ?Sized>(
        &mut self,
        graph: &mut PropagationGraph,
        world: &W,
        section: i64,
    ) {
        graph.enqueue_section_border_checks(section);
        Self::enqueue_emitters(graph, world, SectionPos::of_long(section));
    }

    fn propagate_light_sources<W: LightChunkAccess + ?Sized>(
        &mut self,
        graph: &mut PropagationGraph,
        world: &W,
        column: ChunkPos,
    ) {
        graph.storage_mut().set_light_enabled(column.as_i64(), true);
        let (min_section, max_section) = (
            graph.storage().min_light_section(),
            graph.storage().max_light_section(),
        );
        let ChunkPos(pos) = column;
        for y in min_section..=max_section {
            Self::enqueue_emitters(graph, world, SectionPos::new(pos.x, y, pos.y));
        }
    }
}

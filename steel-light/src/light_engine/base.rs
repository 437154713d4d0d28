//! Base light engine for flood-fill light propagation.
//!
//! Both light layers share the relaxation in this module. A layer only decides how
//! a single changed cell is re-checked and how a whole column is seeded; that is
//! the [`LightPropagator`] implemented by the block and sky engines.
//!
//! The light engine follows this execution order:
//! 1. Re-check every cell queued with [`LightEngine::check_block`]
//! 2. Process all decrease operations (remove old light)
//! 3. Process all increase operations (add new light)
//!
//! Decreases always run before any increase, across budget-limited calls too, so a
//! stale increase can never carry removed light past the point it was removed.

use std::sync::Arc;

use steel_utils::{BlockPos, ChunkPos, SectionPos};

use crate::{
    config::LightConfig,
    data_layer::DataLayer,
    sparse_position_set::SparsePositionSet,
    storage::{LayerLightSectionStorage, LightLayer, LightSectionReader, SectionListener},
    world::{CellState, LightChunkAccess, shape_occludes},
};

use super::{direction::Direction, light_queue::LightQueue, queue_entry::QueueEntry};

/// The 256 packed positions on the face of `section` that points towards `dir`.
fn face_cells(section: i64, dir: Direction) -> impl Iterator<Item = i64> {
    let origin = SectionPos::of_long(section).origin();
    (0..16).flat_map(move |a| {
        (0..16).map(move |b| {
            let (x, y, z) = match dir {
                Direction::Down => (a, 0, b),
                Direction::Up => (a, 15, b),
                Direction::North => (a, b, 0),
                Direction::South => (a, b, 15),
                Direction::West => (0, a, b),
                Direction::East => (15, a, b),
            };
            origin.offset(x, y, z).as_long()
        })
    })
}

/// The behaviour that differs between the block and the sky layer.
pub trait LightPropagator {
    /// The layer this propagator computes.
    const LAYER: LightLayer;

    /// Whether cells of this layer can emit light themselves.
    const EMISSIVE: bool;

    /// Re-derives one cell whose state may have changed.
    fn check_node<W: LightChunkAccess + ?Sized>(
        &mut self,
        graph: &mut PropagationGraph,
        world: &W,
        pos: i64,
    );

    /// Seeds a section whose storage was just created with made-up data.
    fn on_fresh_section<W: LightChunkAccess + ?Sized>(
        &mut self,
        graph: &mut PropagationGraph,
        world: &W,
        section: i64,
    );

    /// Seeds every source of a freshly loaded column.
    fn propagate_light_sources<W: LightChunkAccess + ?Sized>(
        &mut self,
        graph: &mut PropagationGraph,
        world: &W,
        column: ChunkPos,
    );

    /// Called when a column's blocks become available.
    fn on_column_loaded<W: LightChunkAccess + ?Sized>(&mut self, _world: &W, _column: ChunkPos) {}

    /// Called when a column's blocks go away.
    fn on_column_unloaded(&mut self, _column: ChunkPos) {}
}

/// The storage and work queues one light layer relaxes over.
pub struct PropagationGraph {
    storage: LayerLightSectionStorage,
    /// Queue for light decrease operations.
    decrease_queue: LightQueue,
    /// Queue for light increase operations.
    increase_queue: LightQueue,
    /// Cells to re-check at the start of the next round.
    nodes_to_check: SparsePositionSet,
}

impl PropagationGraph {
    /// Creates a graph with empty queues over the given storage.
    #[must_use]
    pub fn new(storage: LayerLightSectionStorage) -> Self {
        Self {
            storage,
            decrease_queue: LightQueue::new(),
            increase_queue: LightQueue::new(),
            nodes_to_check: SparsePositionSet::new(),
        }
    }

    /// The layer's section storage.
    #[must_use]
    pub fn storage(&self) -> &LayerLightSectionStorage {
        &self.storage
    }

    /// Mutable access to the layer's section storage.
    pub fn storage_mut(&mut self) -> &mut LayerLightSectionStorage {
        &mut self.storage
    }

    /// Enqueues a light increase at the given position.
    #[inline]
    pub fn enqueue_increase(&mut self, pos: i64, entry: QueueEntry) {
        self.increase_queue.enqueue(pos, entry);
    }

    /// Enqueues a light decrease at the given position.
    #[inline]
    pub fn enqueue_decrease(&mut self, pos: i64, entry: QueueEntry) {
        self.decrease_queue.enqueue(pos, entry);
    }

    /// Queues a cell for re-checking at the start of the next round.
    #[inline]
    pub fn enqueue_check(&mut self, pos: i64) {
        self.nodes_to_check.add(pos);
    }

    /// Queues the face cells of a section for re-checking, so they pull in light
    /// from the neighboring sections. Faces towards sections without storage or
    /// without any light are skipped.
    pub fn enqueue_section_border_checks(&mut self, section: i64) {
        for dir in Direction::ALL {
            let (dx, dy, dz) = dir.offset();
            let neighbor = SectionPos::offset_long(section, dx, dy, dz);
            let dark = self
                .storage
                .updating()
                .layer(neighbor)
                .is_none_or(|layer| matches!(**layer, DataLayer::Homogeneous(0)));
            if dark {
                continue;
            }
            for pos in face_cells(section, dir) {
                self.nodes_to_check.add(pos);
            }
        }
    }

    /// Re-propagates the stored light of a section's face cells outwards.
    pub fn enqueue_section_border_increases(&mut self, section: i64) {
        for dir in Direction::ALL {
            for pos in face_cells(section, dir) {
                let level = self.storage.get_stored_level(pos);
                if level > 1 {
                    self.enqueue_increase(pos, QueueEntry::increase_all_directions(level, false));
                }
            }
        }
    }

    fn has_queued_work(&self) -> bool {
        !self.nodes_to_check.is_empty()
            || !self.decrease_queue.is_empty()
            || !self.increase_queue.is_empty()
    }

    /// Handles one dequeued increase.
    ///
    /// Entries whose level no longer matches the stored level are stale and dropped.
    /// An emission entry first raises the cell to its current emission.
    fn process_increase<W: LightChunkAccess + ?Sized>(
        &mut self,
        world: &W,
        pos: i64,
        entry: QueueEntry,
    ) {
        let mut stored = self.storage.get_stored_level(pos);
        if entry.is_from_emission() {
            let emission = world.cell_state_or_opaque(BlockPos::of_long(pos)).emission;
            if stored < emission {
                self.storage.set_stored_level(pos, emission);
                stored = emission;
            }
            if emission > 0 && stored == emission {
                self.propagate_increase(world, pos, entry, stored);
                return;
            }
        }
        if stored == entry.level() {
            self.propagate_increase(world, pos, entry, stored);
        }
    }

    /// Pushes `level` from `pos` into every neighbor the entry allows.
    ///
    /// A neighbor is raised to `level - opacity` if that is brighter than what it
    /// holds and no sealed face lies between the two cells.
    pub fn propagate_increase<W: LightChunkAccess + ?Sized>(
        &mut self,
        world: &W,
        pos: i64,
        entry: QueueEntry,
        level: u8,
    ) {
        let mut from_state: Option<CellState> = None;
        for dir in Direction::ALL {
            if !entry.should_propagate(dir) {
                continue;
            }
            let to = dir.relative_long(pos);
            if !self
                .storage
                .storing_light_for_section(SectionPos::block_to_section(to))
            {
                continue;
            }
            let to_level = self.storage.get_stored_level(to);
            if level <= to_level + 1 {
                continue;
            }
            let to_state = world.cell_state_or_opaque(BlockPos::of_long(to));
            let new_level = level.saturating_sub(to_state.opacity());
            if new_level <= to_level {
                continue;
            }
            let from = *from_state.get_or_insert_with(|| {
                if entry.is_from_empty_shape() {
                    CellState::AIR
                } else {
                    world.cell_state_or_opaque(BlockPos::of_long(pos))
                }
            });
            if shape_occludes(&from, &to_state, dir) {
                continue;
            }

            self.storage.set_stored_level(to, new_level);
            if new_level > 1 {
                self.enqueue_increase(
                    to,
                    QueueEntry::increase_skip_one_direction(
                        new_level,
                        to_state.is_empty_shape(),
                        dir.opposite(),
                    ),
                );
            }
        }
    }

    /// Withdraws the light an entry's level could have given each neighbor.
    ///
    /// Neighbors dimmer than the entry are zeroed and continue the decrease; brighter
    /// ones are lit from elsewhere and push their light back. Zeroed emitters are
    /// re-seeded from their emission. Sealed faces are not consulted, so light that
    /// crossed a face before it was sealed is withdrawn as well.
    pub fn propagate_decrease<W: LightChunkAccess + ?Sized>(
        &mut self,
        world: &W,
        emissive: bool,
        pos: i64,
        entry: QueueEntry,
    ) {
        let level = entry.level();
        for dir in Direction::ALL {
            if !entry.should_propagate(dir) {
                continue;
            }
            let to = dir.relative_long(pos);
            if !self
                .storage
                .storing_light_for_section(SectionPos::block_to_section(to))
            {
                continue;
            }
            let to_level = self.storage.get_stored_level(to);
            if to_level == 0 {
                continue;
            }

            if to_level < level {
                let to_state = if emissive {
                    world.cell_state_or_opaque(BlockPos::of_long(to))
                } else {
                    CellState::AIR
                };
                self.storage.set_stored_level(to, 0);
                if to_state.emission < to_level {
                    self.enqueue_decrease(
                        to,
                        QueueEntry::decrease_skip_one_direction(to_level, dir.opposite()),
                    );
                }
                if to_state.emission > 0 {
                    self.enqueue_increase(
                        to,
                        QueueEntry::increase_from_emission(
                            to_state.emission,
                            to_state.is_empty_shape(),
                        ),
                    );
                }
            } else {
                self.enqueue_increase(
                    to,
                    QueueEntry::increase_only_one_direction(to_level, false, dir.opposite()),
                );
            }
        }
    }
}

/// One light layer: a [`PropagationGraph`] driven by a [`LightPropagator`].
pub struct LightEngine<P> {
    graph: PropagationGraph,
    propagator: P,
}

impl<P: LightPropagator> LightEngine<P> {
    /// Creates an engine with empty storage and queues.
    #[must_use]
    pub fn new(config: &LightConfig, propagator: P) -> Self {
        Self {
            graph: PropagationGraph::new(LayerLightSectionStorage::new(P::LAYER, config)),
            propagator,
        }
    }

    /// The propagation state.
    #[must_use]
    pub fn graph(&self) -> &PropagationGraph {
        &self.graph
    }

    /// The layer specific part of the engine.
    #[must_use]
    pub fn propagator(&self) -> &P {
        &self.propagator
    }

    /// Queues the cell for re-checking in the next round. The world must already
    /// hold the cell's new state.
    pub fn check_block(&mut self, pos: BlockPos) {
        self.graph.enqueue_check(pos.as_long());
    }

    /// Checks if there are any pending light updates.
    #[must_use]
    pub fn has_light_work(&self) -> bool {
        self.graph.has_queued_work() || self.graph.storage.has_inconsistencies()
    }

    /// Runs one round of at most `budget` propagation steps and returns the unused
    /// budget.
    ///
    /// Re-checking queued cells does not count against the budget. Work left over
    /// is resumed by the next call. The round is published to readers only once no
    /// decrease is pending, so readers never see light that is being withdrawn.
    pub fn run_light_updates<W: LightChunkAccess + ?Sized>(
        &mut self,
        world: &W,
        budget: usize,
    ) -> usize {
        for section in self.graph.storage.take_fresh_sections() {
            if self.graph.storage.storing_light_for_section(section) {
                self.propagator
                    .on_fresh_section(&mut self.graph, world, section);
            }
        }

        let checks = self.graph.nodes_to_check.len();
        while let Some(pos) = self.graph.nodes_to_check.remove_first() {
            self.propagator.check_node(&mut self.graph, world, pos);
        }

        let mut remaining = budget;
        let mut decreases = 0usize;
        let mut increases = 0usize;
        while remaining > 0 {
            if let Some((pos, entry)) = self.graph.decrease_queue.dequeue() {
                self.graph
                    .propagate_decrease(world, P::EMISSIVE, pos, entry);
                decreases += 1;
            } else if let Some((pos, entry)) = self.graph.increase_queue.dequeue() {
                self.graph.process_increase(world, pos, entry);
                increases += 1;
            } else {
                break;
            }
            remaining -= 1;
        }

        self.graph.storage.mark_new_inconsistencies();
        if self.graph.decrease_queue.is_empty() {
            self.graph.storage.swap_section_map();
        }

        if checks + decreases + increases > 0 {
            log::debug!(
                "{:?} light round: {checks} checks, {decreases} decreases, {increases} increases, {} still queued",
                P::LAYER,
                self.graph.decrease_queue.len() + self.graph.increase_queue.len()
            );
        }
        remaining
    }

    /// Records whether a section holds blocks.
    pub fn update_section_status(&mut self, section: SectionPos, is_empty: bool) {
        self.graph
            .storage
            .update_section_status(section.as_long(), is_empty);
    }

    /// Switches light on or off for a column.
    pub fn set_light_enabled(&mut self, column: ChunkPos, enabled: bool) {
        self.graph
            .storage
            .set_light_enabled(column.as_i64(), enabled);
    }

    /// Seeds every source of a column. Enables light for the column.
    pub fn propagate_light_sources<W: LightChunkAccess + ?Sized>(
        &mut self,
        world: &W,
        column: ChunkPos,
    ) {
        self.propagator
            .propagate_light_sources(&mut self.graph, world, column);
    }

    /// Tells the layer a column's blocks are available.
    pub fn on_column_loaded<W: LightChunkAccess + ?Sized>(&mut self, world: &W, column: ChunkPos) {
        self.propagator.on_column_loaded(world, column);
    }

    /// Tells the layer a column's blocks are gone.
    pub fn on_column_unloaded(&mut self, column: ChunkPos) {
        self.propagator.on_column_unloaded(column);
    }

    /// Supplies persisted data for a section, or withdraws it with `None`.
    pub fn queue_section_data(&mut self, section: SectionPos, data: Option<DataLayer>) {
        self.graph
            .storage
            .queue_section_data(section.as_long(), data);
    }

    /// Keeps queued data of a column around while it is not loaded.
    pub fn retain_data(&mut self, column: ChunkPos, retain: bool) {
        self.graph.storage.retain_data(column.as_i64(), retain);
    }

    /// The published light value at a position.
    #[must_use]
    pub fn get_light_value(&self, pos: BlockPos) -> u8 {
        self.graph.storage.reader().light_value(pos)
    }

    /// The level currently stored at a position, published or not.
    #[must_use]
    pub fn get_stored_level(&self, pos: BlockPos) -> u8 {
        self.graph.storage.get_stored_level(pos.as_long())
    }

    /// The published data of a section.
    #[must_use]
    pub fn get_data_layer_data(&self, section: SectionPos) -> Option<Arc<DataLayer>> {
        self.graph.storage.get_data_layer_data(section.as_long())
    }

    /// A handle for reading published data from other threads.
    #[must_use]
    pub fn reader(&self) -> LightSectionReader {
        self.graph.storage.reader()
    }

    /// Registers the callback told about every published section.
    pub fn set_listener(&mut self, listener: SectionListener) {
        self.graph.storage.set_listener(listener);
    }

    /// Sections published since the last call.
    pub fn take_changed_sections(&mut self) -> Vec<SectionPos> {
        self.graph.storage.take_changed_sections()
    }
}

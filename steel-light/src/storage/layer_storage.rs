//! Section storage of one light layer.
//!
//! Writes go to the "updating" section map. At the end of a round the map is
//! cloned (the map itself, not the layers, which are shared through `Arc`) and
//! published through an [`ArcSwap`], so readers on other threads always see a
//! complete round and never block the driving thread. The first write to a shared
//! layer after a publish copies it.

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::{FxHashMap, FxHashSet};
use steel_utils::{BlockPos, SectionPos, types::section_relative};

use crate::{
    MAX_LEVEL,
    config::LightConfig,
    data_layer::{DataLayer, cell_index},
};

use super::section_state::{SectionState, SectionType};

/// The two independent light layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightLayer {
    /// Light emitted by blocks.
    Block,
    /// Light arriving from the open sky.
    Sky,
}

/// Receives every section published by a swap.
pub type SectionListener = Box<dyn FnMut(SectionPos) + Send>;

/// Index of a packed block position inside its section's [`DataLayer`].
#[must_use]
#[inline]
pub fn local_index(pos: i64) -> usize {
    cell_index(
        section_relative(BlockPos::x(pos)),
        section_relative(BlockPos::y(pos)),
        section_relative(BlockPos::z(pos)),
    )
}

/// One generation of section data.
#[derive(Debug, Clone)]
pub struct SectionMap {
    layer: LightLayer,
    max_light_section: i32,
    layers: FxHashMap<i64, Arc<DataLayer>>,
    lit_columns: Arc<FxHashSet<i64>>,
}

impl SectionMap {
    fn new(layer: LightLayer, max_light_section: i32) -> Self {
        Self {
            layer,
            max_light_section,
            layers: FxHashMap::default(),
            lit_columns: Arc::new(FxHashSet::default()),
        }
    }

    /// The layer stored for a packed section position.
    #[must_use]
    pub fn layer(&self, section: i64) -> Option<&Arc<DataLayer>> {
        self.layers.get(&section)
    }

    fn layer_mut(&mut self, section: i64) -> Option<&mut DataLayer> {
        self.layers.get_mut(&section).map(Arc::make_mut)
    }

    /// Whether a layer is stored for the section.
    #[must_use]
    pub fn has_layer(&self, section: i64) -> bool {
        self.layers.contains_key(&section)
    }

    /// Number of stored layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no layer is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Whether sky light is switched on for the column.
    #[must_use]
    pub fn is_column_lit(&self, column: i64) -> bool {
        self.lit_columns.contains(&column)
    }

    /// The light value at a packed block position.
    ///
    /// Sky reads inside sections without storage continue up the column to the
    /// nearest stored section and use its bottom slice; open sky above every stored
    /// section reads 15 in lit columns.
    #[must_use]
    pub fn light_value(&self, pos: i64) -> u8 {
        let section = SectionPos::block_to_section(pos);
        if let Some(layer) = self.layers.get(&section) {
            return layer.get_index(local_index(pos));
        }
        if self.layer == LightLayer::Block {
            return 0;
        }

        let x = section_relative(BlockPos::x(pos));
        let z = section_relative(BlockPos::z(pos));
        let mut above = section;
        while SectionPos::y(above) < self.max_light_section {
            above = SectionPos::offset_long(above, 0, 1, 0);
            if let Some(layer) = self.layers.get(&above) {
                return layer.get(x, 0, z);
            }
        }
        if self.is_column_lit(SectionPos::chunk_key(section)) {
            MAX_LEVEL
        } else {
            0
        }
    }
}

/// A cheap, cloneable handle onto the published generation of one layer.
#[derive(Clone)]
pub struct LightSectionReader {
    visible: Arc<ArcSwap<SectionMap>>,
}

impl LightSectionReader {
    /// The published light value at a block position.
    #[must_use]
    pub fn light_value(&self, pos: BlockPos) -> u8 {
        self.visible.load().light_value(pos.as_long())
    }

    /// The published layer of a section, if it has storage.
    #[must_use]
    pub fn data_layer(&self, section: SectionPos) -> Option<Arc<DataLayer>> {
        self.visible.load().layer(section.as_long()).cloned()
    }
}

/// Section data, lifecycle and publication for one light layer.
pub struct LayerLightSectionStorage {
    layer: LightLayer,
    min_light_section: i32,
    max_light_section: i32,
    section_states: FxHashMap<i64, SectionState>,
    updating: SectionMap,
    visible: Arc<ArcSwap<SectionMap>>,
    changed_sections: FxHashSet<i64>,
    published_sections: FxHashSet<i64>,
    queued_sections: FxHashMap<i64, DataLayer>,
    columns_to_retain_queued_data_for: FxHashSet<i64>,
    to_remove: FxHashSet<i64>,
    fresh_sections: Vec<i64>,
    has_inconsistencies: bool,
    lit_columns_changed: bool,
    listener: Option<SectionListener>,
}

impl LayerLightSectionStorage {
    /// Creates an empty storage covering one section below and above the world.
    #[must_use]
    pub fn new(layer: LightLayer, config: &LightConfig) -> Self {
        let min_light_section = config.min_section() - 1;
        let max_light_section = config.max_section();
        let updating = SectionMap::new(layer, max_light_section);
        Self {
            layer,
            min_light_section,
            max_light_section,
            section_states: FxHashMap::default(),
            visible: Arc::new(ArcSwap::from_pointee(updating.clone())),
            updating,
            changed_sections: FxHashSet::default(),
            published_sections: FxHashSet::default(),
            queued_sections: FxHashMap::default(),
            columns_to_retain_queued_data_for: FxHashSet::default(),
            to_remove: FxHashSet::default(),
            fresh_sections: Vec::new(),
            has_inconsistencies: false,
            lit_columns_changed: false,
            listener: None,
        }
    }

    /// Which layer this storage holds.
    #[must_use]
    pub fn layer(&self) -> LightLayer {
        self.layer
    }

    /// Lowest section y that may hold light.
    #[must_use]
    pub fn min_light_section(&self) -> i32 {
        self.min_light_section
    }

    /// Highest section y that may hold light.
    #[must_use]
    pub fn max_light_section(&self) -> i32 {
        self.max_light_section
    }

    /// Whether a section y lies in the range this storage covers.
    #[must_use]
    pub fn is_in_light_range(&self, section_y: i32) -> bool {
        (self.min_light_section..=self.max_light_section).contains(&section_y)
    }

    /// Registers the callback told about every published section.
    pub fn set_listener(&mut self, listener: SectionListener) {
        self.listener = Some(listener);
    }

    /// A handle for reading published data from any thread.
    #[must_use]
    pub fn reader(&self) -> LightSectionReader {
        LightSectionReader {
            visible: Arc::clone(&self.visible),
        }
    }

    /// The section map being written this round.
    #[must_use]
    pub fn updating(&self) -> &SectionMap {
        &self.updating
    }

    /// Whether the updating generation has a layer for the section.
    #[must_use]
    #[inline]
    pub fn storing_light_for_section(&self, section: i64) -> bool {
        self.updating.has_layer(section)
    }

    /// The level stored at a packed block position, 0 without storage.
    #[must_use]
    #[inline]
    pub fn get_stored_level(&self, pos: i64) -> u8 {
        self.updating
            .layer(SectionPos::block_to_section(pos))
            .map_or(0, |layer| layer.get_index(local_index(pos)))
    }

    /// Writes a level. Positions in sections without storage are ignored.
    pub fn set_stored_level(&mut self, pos: i64, level: u8) {
        let section = SectionPos::block_to_section(pos);
        let Some(layer) = self.updating.layer_mut(section) else {
            log::trace!(
                "Dropped light write into unstored section {:?}",
                SectionPos::of_long(section)
            );
            return;
        };
        if level > MAX_LEVEL {
            log::warn!("Clamped out of range light level {level}");
        }
        layer.set_index(local_index(pos), level.min(MAX_LEVEL));
        self.changed_sections.insert(section);
    }

    /// Overwrites a whole section at once. Sections without storage are ignored.
    pub fn fill_section(&mut self, section: i64, level: u8) {
        if let Some(layer) = self.updating.layer_mut(section) {
            if layer.uniform_level() != Some(level) {
                layer.fill(level);
                self.changed_sections.insert(section);
            }
        }
    }

    /// Light value in the updating generation, including sky reads above storage.
    #[must_use]
    pub fn get_light_value(&self, pos: i64) -> u8 {
        self.updating.light_value(pos)
    }

    /// The lifecycle category of a section.
    #[must_use]
    pub fn section_type(&self, section: i64) -> SectionType {
        self.section_states
            .get(&section)
            .copied()
            .unwrap_or_default()
            .section_type()
    }

    /// Records whether a section holds blocks, updating its 26 neighbors' counters.
    pub fn update_section_status(&mut self, section: i64, is_empty: bool) {
        if !self.is_in_light_range(SectionPos::y(section)) {
            return;
        }
        let old = self.state(section);
        let new = old.with_has_data(!is_empty);
        if old == new {
            return;
        }
        self.put_section_state(section, new);

        let delta = if is_empty { -1 } else { 1 };
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    let neighbor = SectionPos::offset_long(section, dx, dy, dz);
                    if !self.is_in_light_range(SectionPos::y(neighbor)) {
                        continue;
                    }
                    let state = self.state(neighbor);
                    let count = i32::from(state.neighbor_count()) + delta;
                    self.put_section_state(neighbor, state.with_neighbor_count(count));
                }
            }
        }
    }

    fn state(&self, section: i64) -> SectionState {
        self.section_states
            .get(&section)
            .copied()
            .unwrap_or_default()
    }

    fn put_section_state(&mut self, section: i64, state: SectionState) {
        let old_type = self.state(section).section_type();
        let new_type = state.section_type();
        if state == SectionState::EMPTY {
            self.section_states.remove(&section);
        } else {
            self.section_states.insert(section, state);
        }
        if old_type == new_type {
            return;
        }
        log::trace!(
            "{:?} light section {:?}: {old_type:?} -> {new_type:?}",
            self.layer,
            SectionPos::of_long(section)
        );
        if old_type == SectionType::Empty {
            self.initialize_section(section);
        } else if new_type == SectionType::Empty {
            self.remove_section(section);
        }
    }

    fn initialize_section(&mut self, section: i64) {
        self.has_inconsistencies = true;
        if self.to_remove.remove(&section) {
            // retirement cancelled, the old data is still in place
            return;
        }
        let (layer, fresh) = self.create_data_layer(section);
        self.updating.layers.insert(section, Arc::new(layer));
        self.changed_sections.insert(section);
        if fresh {
            self.fresh_sections.push(section);
        }
    }

    fn remove_section(&mut self, section: i64) {
        self.to_remove.insert(section);
        self.has_inconsistencies = true;
    }

    /// Initial data of a section leaving `EMPTY`, and whether it was made up
    /// rather than taken from queued data.
    fn create_data_layer(&mut self, section: i64) -> (DataLayer, bool) {
        if let Some(queued) = self.queued_sections.remove(&section) {
            return (queued, false);
        }
        if self.layer == LightLayer::Block {
            return (DataLayer::new_empty(), true);
        }

        let mut above = section;
        while SectionPos::y(above) < self.max_light_section {
            above = SectionPos::offset_long(above, 0, 1, 0);
            if let Some(layer) = self.updating.layer(above) {
                return (DataLayer::repeat_first_layer(layer), true);
            }
        }
        let level = if self.is_light_enabled(SectionPos::chunk_key(section)) {
            MAX_LEVEL
        } else {
            0
        };
        (DataLayer::new_filled(level), true)
    }

    /// Sections created with made-up data since the last call. Their borders and
    /// sources have to be re-derived by the engine.
    pub fn take_fresh_sections(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.fresh_sections)
    }

    /// Whether a consistency pass has work to do.
    #[must_use]
    pub fn has_inconsistencies(&self) -> bool {
        self.has_inconsistencies
    }

    /// Frees retired sections and applies queued data to sections with storage.
    ///
    /// Retired layers of retained columns are kept as queued data. Queued data of
    /// sections without storage is dropped unless its column is retained.
    pub fn mark_new_inconsistencies(&mut self) {
        if !self.has_inconsistencies {
            return;
        }
        self.has_inconsistencies = false;

        for section in std::mem::take(&mut self.to_remove) {
            let Some(layer) = self.updating.layers.remove(&section) else {
                continue;
            };
            if self
                .columns_to_retain_queued_data_for
                .contains(&SectionPos::chunk_key(section))
            {
                self.queued_sections
                    .insert(section, Arc::unwrap_or_clone(layer));
            }
            self.changed_sections.insert(section);
        }

        let queued = std::mem::take(&mut self.queued_sections);
        for (section, layer) in queued {
            if let Some(current) = self.updating.layers.get_mut(&section) {
                if **current != layer {
                    *current = Arc::new(layer);
                    self.changed_sections.insert(section);
                }
            } else if self
                .columns_to_retain_queued_data_for
                .contains(&SectionPos::chunk_key(section))
            {
                self.queued_sections.insert(section, layer);
            } else {
                log::trace!(
                    "Dropped queued {:?} light data for {:?}",
                    self.layer,
                    SectionPos::of_long(section)
                );
            }
        }
    }

    /// Supplies persisted data for a section, or withdraws it with `None`.
    pub fn queue_section_data(&mut self, section: i64, data: Option<DataLayer>) {
        match data {
            Some(layer) => {
                self.queued_sections.insert(section, layer);
                self.has_inconsistencies = true;
            }
            None => {
                self.queued_sections.remove(&section);
            }
        }
    }

    /// Whether queued data of the column's sections survives consistency passes.
    pub fn retain_data(&mut self, column: i64, retain: bool) {
        if retain {
            self.columns_to_retain_queued_data_for.insert(column);
        } else {
            self.columns_to_retain_queued_data_for.remove(&column);
            self.has_inconsistencies = true;
        }
    }

    /// Switches light on or off for a column.
    pub fn set_light_enabled(&mut self, column: i64, enabled: bool) {
        let lit = self.updating.lit_columns.contains(&column);
        if lit == enabled {
            return;
        }
        let columns = Arc::make_mut(&mut self.updating.lit_columns);
        if enabled {
            columns.insert(column);
        } else {
            columns.remove(&column);
        }
        self.lit_columns_changed = true;
    }

    /// Whether light is switched on for a column.
    #[must_use]
    pub fn is_light_enabled(&self, column: i64) -> bool {
        self.updating.is_column_lit(column)
    }

    /// Whether anything was written since the last publish.
    #[must_use]
    pub fn has_unpublished_changes(&self) -> bool {
        !self.changed_sections.is_empty() || self.lit_columns_changed
    }

    /// Publishes the updating generation and reports the changed sections.
    pub fn swap_section_map(&mut self) {
        if !self.has_unpublished_changes() {
            return;
        }
        self.visible.store(Arc::new(self.updating.clone()));
        self.lit_columns_changed = false;

        log::trace!(
            "Published {} changed {:?} light sections",
            self.changed_sections.len(),
            self.layer
        );
        for section in self.changed_sections.drain() {
            if let Some(listener) = &mut self.listener {
                listener(SectionPos::of_long(section));
            }
            self.published_sections.insert(section);
        }
    }

    /// Sections published since the last call.
    pub fn take_changed_sections(&mut self) -> Vec<SectionPos> {
        self.published_sections
            .drain()
            .map(SectionPos::of_long)
            .collect()
    }

    /// The published layer of a section.
    #[must_use]
    pub fn get_data_layer_data(&self, section: i64) -> Option<Arc<DataLayer>> {
        self.visible.load().layer(section).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn block_storage() -> LayerLightSectionStorage {
        LayerLightSectionStorage::new(LightLayer::Block, &LightConfig::default())
    }

    fn section(x: i32, y: i32, z: i32) -> i64 {
        SectionPos::pack(x, y, z)
    }

    #[test]
    fn test_non_empty_section_allocates_itself_and_neighbors() {
        let mut storage = block_storage();
        storage.update_section_status(section(0, 0, 0), false);

        assert_eq!(
            storage.section_type(section(0, 0, 0)),
            SectionType::LightAndData
        );
        assert_eq!(
            storage.section_type(section(1, 1, 1)),
            SectionType::LightOnly
        );
        assert_eq!(storage.section_type(section(2, 0, 0)), SectionType::Empty);
        assert!(storage.storing_light_for_section(section(-1, 0, 1)));
        assert_eq!(storage.updating().len(), 27);
    }

    #[test]
    fn test_retirement_waits_for_consistency_pass() {
        let mut storage = block_storage();
        let center = section(0, 0, 0);
        storage.update_section_status(center, false);
        storage.update_section_status(center, true);

        assert_eq!(storage.section_type(center), SectionType::Empty);
        assert!(storage.storing_light_for_section(center));
        storage.mark_new_inconsistencies();
        assert!(!storage.storing_light_for_section(center));
        assert!(storage.updating().is_empty());
    }

    #[test]
    fn test_cancelled_retirement_keeps_data() {
        let mut storage = block_storage();
        let center = section(0, 0, 0);
        let pos = BlockPos::new(3, 4, 5).as_long();
        storage.update_section_status(center, false);
        storage.set_stored_level(pos, 9);
        storage.update_section_status(center, true);
        storage.update_section_status(center, false);
        storage.mark_new_inconsistencies();
        assert_eq!(storage.get_stored_level(pos), 9);
    }

    #[test]
    fn test_writes_publish_on_swap() {
        let mut storage = block_storage();
        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        storage.set_listener(Box::new(move |section| {
            sink.lock().push(section);
        }));
        storage.update_section_status(section(0, 0, 0), false);
        storage.swap_section_map();
        published.lock().clear();
        storage.take_changed_sections();

        let reader = storage.reader();
        let pos = BlockPos::new(1, 1, 1);
        storage.set_stored_level(pos.as_long(), 12);
        assert_eq!(reader.light_value(pos), 0);

        storage.swap_section_map();
        assert_eq!(reader.light_value(pos), 12);
        assert_eq!(*published.lock(), vec![SectionPos::new(0, 0, 0)]);
        assert_eq!(
            storage.take_changed_sections(),
            vec![SectionPos::new(0, 0, 0)]
        );
    }

    #[test]
    fn test_published_layers_are_not_mutated_by_later_writes() {
        let mut storage = block_storage();
        let pos = BlockPos::new(0, 0, 0).as_long();
        storage.update_section_status(section(0, 0, 0), false);
        storage.set_stored_level(pos, 3);
        storage.swap_section_map();
        let before = storage
            .get_data_layer_data(section(0, 0, 0))
            .expect("published layer");

        storage.set_stored_level(pos, 8);
        assert_eq!(before.get_index(local_index(pos)), 3);
        assert_eq!(storage.get_stored_level(pos), 8);
    }

    #[test]
    fn test_queued_data_applies_to_stored_sections() {
        let mut storage = block_storage();
        let target = section(0, 0, 0);
        storage.update_section_status(target, false);
        storage.queue_section_data(target, Some(DataLayer::new_filled(6)));
        storage.mark_new_inconsistencies();
        assert_eq!(storage.get_stored_level(BlockPos::new(7, 7, 7).as_long()), 6);
    }

    #[test]
    fn test_queued_data_waits_only_for_retained_columns() {
        let mut storage = block_storage();
        let retained = section(0, 0, 0);
        let dropped = section(10, 0, 10);
        storage.retain_data(SectionPos::chunk_key(retained), true);
        storage.queue_section_data(retained, Some(DataLayer::new_filled(4)));
        storage.queue_section_data(dropped, Some(DataLayer::new_filled(4)));
        storage.mark_new_inconsistencies();

        storage.update_section_status(retained, false);
        storage.update_section_status(dropped, false);
        assert_eq!(storage.get_stored_level(BlockPos::new(1, 1, 1).as_long()), 4);
        assert_eq!(
            storage.get_stored_level(BlockPos::new(161, 1, 161).as_long()),
            0
        );
        // made-up layers are reported, queued ones are not
        assert!(!storage.take_fresh_sections().contains(&retained));
    }

    #[test]
    fn test_sky_reads_walk_up_the_column() {
        let mut storage = LayerLightSectionStorage::new(LightLayer::Sky, &LightConfig::default());
        let column = SectionPos::chunk_key(section(0, 0, 0));
        storage.set_light_enabled(column, true);
        assert_eq!(storage.get_light_value(BlockPos::new(2, 0, 2).as_long()), 15);

        // every new layer starts out as open sky
        storage.update_section_status(section(0, 4, 0), false);
        assert_eq!(storage.get_light_value(BlockPos::new(2, 60, 2).as_long()), 15);

        storage.set_stored_level(BlockPos::new(2, 48, 2).as_long(), 5);
        assert_eq!(storage.get_light_value(BlockPos::new(2, 48, 2).as_long()), 5);
        // section 1 has no storage and repeats the bottom slice of section 3
        assert_eq!(storage.get_light_value(BlockPos::new(2, 20, 2).as_long()), 5);
        assert_eq!(storage.get_light_value(BlockPos::new(3, 20, 2).as_long()), 15);

        storage.set_light_enabled(column, false);
        assert_eq!(storage.get_light_value(BlockPos::new(2, 500, 2).as_long()), 0);
    }
}

//! Threaded light engine with task queue system.
//!
//! Any thread may queue work; the thread driving [`ThreadedLevelLightEngine::run_update`]
//! applies it in batches. Tasks are divided into `PreUpdate` (setup) and `PostUpdate`
//! (completion) phases around each propagation round.

use parking_lot::Mutex;
use steel_utils::{BlockPos, ChunkPos, SectionPos};

use crate::{
    config::LightConfig,
    data_layer::DataLayer,
    storage::LightLayer,
    world::LightChunkAccess,
};

use super::level_light_engine::{LevelLightEngine, LevelLightReader};

/// Task type for light engine operations.
///
/// Tasks are executed in a specific order to ensure correct light propagation:
/// 1. All `PreUpdate` tasks run first (marking sections, queueing changes)
/// 2. Light propagation runs (`run_light_updates`)
/// 3. All `PostUpdate` tasks run last (enabling columns, dropping retained data)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// Tasks executed before light propagation (setup phase).
    PreUpdate,
    /// Tasks executed after light propagation (completion phase).
    PostUpdate,
}

type LightTaskFn = Box<dyn FnOnce(&mut LevelLightEngine, &dyn LightChunkAccess) + Send>;

/// A light engine task with its associated type.
type LightTask = (TaskType, LightTaskFn);

/// Multi-threaded front for a [`LevelLightEngine`] that batches and schedules
/// lighting operations.
///
/// # Architecture
///
/// 1. Public methods (like [`Self::initialize_light`]) create tasks
/// 2. Tasks are queued until the batch size is reached or an update is forced
/// 3. [`Self::run_update`] executes `PreUpdate` tasks, one propagation round, then
///    `PostUpdate` tasks
///
/// Readers obtained from [`Self::reader`] never wait on the driving thread.
pub struct ThreadedLevelLightEngine {
    /// The engines for propagation, locked only by the driving thread.
    engine: Mutex<LevelLightEngine>,
    /// Queued tasks waiting to be executed.
    light_tasks: Mutex<Vec<LightTask>>,
    reader: LevelLightReader,
    min_section: i32,
    max_section: i32,
    task_batch_size: usize,
    updates_per_tick: usize,
}

impl ThreadedLevelLightEngine {
    /// Creates a new threaded light engine.
    #[must_use]
    pub fn new(config: &LightConfig) -> Self {
        let engine = LevelLightEngine::new(config);
        let reader = engine.reader();
        Self {
            engine: Mutex::new(engine),
            light_tasks: Mutex::new(Vec::new()),
            reader,
            min_section: config.min_section(),
            max_section: config.max_section(),
            task_batch_size: config.task_batch_size,
            updates_per_tick: config.updates_per_tick,
        }
    }

    /// Queues a changed cell.
    pub fn check_block(&self, pos: BlockPos) {
        self.add_task(TaskType::PreUpdate, move |engine, _| engine.check_block(pos));
    }

    /// Queues a section becoming empty or non-empty.
    pub fn update_section_status(&self, section: SectionPos, is_empty: bool) {
        self.add_task(TaskType::PreUpdate, move |engine, _| {
            engine.update_section_status(section, is_empty);
        });
    }

    /// Prepares a column for lighting.
    ///
    /// Marks its non-empty sections before the next round. Afterwards records
    /// whether the column's light is already correct and stops retaining its queued
    /// data. No light is computed until [`Self::light_chunk`].
    pub fn initialize_light(&self, column: ChunkPos, light_enabled: bool) {
        let (min_section, max_section) = (self.min_section, self.max_section);
        self.add_task(TaskType::PreUpdate, move |engine, world| {
            let ChunkPos(pos) = column;
            for y in min_section..max_section {
                let section = SectionPos::new(pos.x, y, pos.y);
                if !world.is_section_empty(section) {
                    engine.update_section_status(section, false);
                }
            }
        });
        self.add_task(TaskType::PostUpdate, move |engine, _| {
            engine.set_light_enabled(column, light_enabled);
            engine.retain_data(column, false);
        });
    }

    /// Computes light for a column whose blocks are in the world.
    ///
    /// With `light_enabled` the column already carries persisted light and only its
    /// source index is built; otherwise every source is seeded. The column ends up
    /// with light enabled even when [`Self::initialize_light`] for it landed in the
    /// same batch.
    pub fn light_chunk(&self, column: ChunkPos, light_enabled: bool) {
        self.add_task(TaskType::PreUpdate, move |engine, world| {
            engine.set_light_enabled(column, true);
            engine.on_column_loaded(world, column);
            if !light_enabled {
                engine.propagate_light_sources(world, column);
            }
        });
        self.add_task(TaskType::PostUpdate, move |engine, _| {
            engine.set_light_enabled(column, true);
            engine.retain_data(column, false);
        });
    }

    /// Forgets a column: its sections become empty and its light is switched off.
    pub fn unload_column(&self, column: ChunkPos) {
        let (min_section, max_section) = (self.min_section, self.max_section);
        self.add_task(TaskType::PreUpdate, move |engine, _| {
            let ChunkPos(pos) = column;
            for y in min_section..max_section {
                engine.update_section_status(SectionPos::new(pos.x, y, pos.y), true);
            }
            engine.set_light_enabled(column, false);
            engine.on_column_unloaded(column);
        });
    }

    /// Queues persisted data for one layer of a section.
    pub fn queue_section_data(&self, layer: LightLayer, section: SectionPos, data: Option<DataLayer>) {
        self.add_task(TaskType::PreUpdate, move |engine, _| {
            engine.queue_section_data(layer, section, data);
        });
    }

    /// Queues a change of a column's data retention.
    pub fn retain_data(&self, column: ChunkPos, retain: bool) {
        self.add_task(TaskType::PreUpdate, move |engine, _| {
            engine.retain_data(column, retain);
        });
    }

    /// Adds a task to the task queue.
    fn add_task<F>(&self, task_type: TaskType, task: F)
    where
        F: FnOnce(&mut LevelLightEngine, &dyn LightChunkAccess) + Send + 'static,
    {
        self.light_tasks.lock().push((task_type, Box::new(task)));
    }

    /// Whether enough tasks are queued that the driver should run an update.
    #[must_use]
    pub fn try_schedule_update(&self) -> bool {
        self.light_tasks.lock().len() >= self.task_batch_size
    }

    /// Runs all queued light tasks and one propagation round of the configured
    /// budget. Returns the number of propagation steps done.
    ///
    /// Execution order:
    /// 1. Execute all `PreUpdate` tasks
    /// 2. Run light propagation (`run_light_updates`)
    /// 3. Execute all `PostUpdate` tasks
    pub fn run_update(&self, world: &dyn LightChunkAccess) -> usize {
        let all_tasks = std::mem::take(&mut *self.light_tasks.lock());

        // Separate tasks by type
        let (pre_update_tasks, post_update_tasks): (Vec<_>, Vec<_>) = all_tasks
            .into_iter()
            .partition(|(task_type, _)| *task_type == TaskType::PreUpdate);
        let task_count = pre_update_tasks.len() + post_update_tasks.len();

        let mut engine = self.engine.lock();
        for (_, task) in pre_update_tasks {
            task(&mut *engine, world);
        }
        let work = engine.run_light_updates(world, self.updates_per_tick);
        for (_, task) in post_update_tasks {
            task(&mut *engine, world);
        }
        drop(engine);

        if task_count > 0 {
            log::debug!("Light update ran {task_count} tasks and {work} propagation steps");
        }
        work
    }

    /// Checks if there are any pending tasks or light updates.
    #[must_use]
    pub fn has_work(&self) -> bool {
        let has_tasks = !self.light_tasks.lock().is_empty();
        has_tasks || self.engine.lock().has_light_work()
    }

    /// Read handles onto the published light of both layers.
    #[must_use]
    pub fn reader(&self) -> LevelLightReader {
        self.reader.clone()
    }

    /// Locks the engines for direct access. Blocks while an update runs.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut LevelLightEngine) -> R) -> R {
        f(&mut *self.engine.lock())
    }
}

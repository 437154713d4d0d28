//! # Steel Light
//!
//! Incremental voxel lighting for block light and sky light.
//!
//! Each light layer keeps sparse per-section [`DataLayer`]s and relaxes them towards a
//! fixed point after cells change: decreases withdraw light first, then increases
//! flood it back in, both ordered by level through bucket queues. Work is bounded
//! per call and resumes on the next one, and finished rounds are published to
//! lock-free readers.

pub mod config;
pub mod data_layer;
pub mod error;
pub mod light_engine;
pub mod sky_light_sources;
pub mod sparse_position_set;
pub mod storage;
pub mod world;

pub use config::LightConfig;
pub use data_layer::DataLayer;
pub use error::LightError;
pub use light_engine::{
    BlockLightEngine, LevelLightEngine, LevelLightReader, SkyLightEngine,
    ThreadedLevelLightEngine,
};
pub use storage::LightLayer;
pub use world::{CellState, LightChunkAccess, OcclusionShape};

/// Highest light level.
pub const MAX_LEVEL: u8 = 15;

/// Number of distinct light levels.
pub const LEVEL_COUNT: usize = 16;

//! Flood-fill light propagation.
//!
//! [`LightEngine`] runs the decrease and increase passes for one layer over a
//! [`PropagationGraph`]; the block and sky layers plug in through [`LightPropagator`].
//! [`LevelLightEngine`] pairs the layers and [`ThreadedLevelLightEngine`] feeds them
//! from a task queue.

mod base;
pub mod block_light_engine;
pub mod bucket_queue;
pub mod direction;
pub mod level_light_engine;
pub mod light_queue;
pub mod queue_entry;
pub mod sky_light_engine;
pub mod threaded_level_light_engine;

pub use base::{LightEngine, LightPropagator, PropagationGraph};
pub use block_light_engine::{BlockLightEngine, BlockLightPropagator};
pub use bucket_queue::BucketQueue;
pub use direction::Direction;
pub use level_light_engine::{LevelLightEngine, LevelLightReader};
pub use light_queue::LightQueue;
pub use queue_entry::QueueEntry;
pub use sky_light_engine::{SkyLightEngine, SkyLightPropagator};
pub use threaded_level_light_engine::{TaskType, ThreadedLevelLightEngine};

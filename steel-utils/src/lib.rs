//! # Steel Utils
//!
//! Coordinate types and small containers shared by the Steel crates.

/// Packed fixed-width containers.
pub mod codec;
/// Integer vector types.
pub mod math;
/// Chunk, block and section coordinates and their packed forms.
pub mod types;

pub use types::{BlockPos, ChunkPos, SectionPos};

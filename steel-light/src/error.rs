//! Errors raised at the fallible edges of the light engine.
//!
//! Propagation itself never fails: out-of-range values are clamped and corrected on
//! later rounds. Only decoding persisted data and loading configuration can fail.

use thiserror::Error;

/// Errors returned by the light engine.
#[derive(Debug, Error)]
pub enum LightError {
    /// A serialized data layer had a length other than 1 or 2048 bytes.
    #[error("invalid data layer length {0}, expected 1 or 2048 bytes")]
    InvalidLayerLength(usize),
    /// A homogeneous data layer encoded a level above 15.
    #[error("light level {0} out of range 0..=15")]
    LevelOutOfRange(u8),
    /// The configuration file could not be read or written.
    #[error("failed to access light config: {0}")]
    ConfigIo(#[from] std::io::Error),
    /// The configuration file could not be parsed.
    #[error("failed to parse light config: {0}")]
    ConfigParse(String),
    /// The configuration was parsed but holds invalid values.
    #[error("invalid light config: {0}")]
    InvalidConfig(&'static str),
}

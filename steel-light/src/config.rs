//! Light engine configuration.

use serde::Deserialize;
use std::{fs, path::Path};

use crate::error::LightError;

const DEFAULT_CONFIG: &str = include_str!("../../package-content/light_config.json5");

/// Settings shared by both light layers.
#[derive(Debug, Clone, Deserialize)]
pub struct LightConfig {
    /// Lowest block y of the world.
    pub min_y: i32,
    /// World height in blocks.
    pub height: i32,
    /// Whether the sky layer is computed.
    pub has_sky_light: bool,
    /// Whether the block layer is computed.
    pub has_block_light: bool,
    /// Default work budget for one update call.
    pub updates_per_tick: usize,
    /// Queued tasks that trigger an update in the threaded front-end.
    pub task_batch_size: usize,
}

impl LightConfig {
    /// Loads the config at `path`, writing the default config there first if missing.
    pub fn load_or_create(path: &Path) -> Result<Self, LightError> {
        let config = if path.exists() {
            let config_str = fs::read_to_string(path)?;
            Self::parse(&config_str)?
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_CONFIG)?;
            log::info!("Wrote default light config to {}", path.display());
            Self::default()
        };
        Ok(config)
    }

    /// Parses and validates a JSON5 config.
    pub fn parse(config_str: &str) -> Result<Self, LightError> {
        let config: LightConfig =
            serde_json5::from_str(config_str).map_err(|e| LightError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values for consistency.
    pub fn validate(&self) -> Result<(), LightError> {
        if self.min_y % 16 != 0 {
            return Err(LightError::InvalidConfig("min_y must be a multiple of 16"));
        }
        if self.height <= 0 || self.height % 16 != 0 {
            return Err(LightError::InvalidConfig(
                "height must be a positive multiple of 16",
            ));
        }
        if self.min_y < -2048 || self.min_y + self.height > 2048 {
            return Err(LightError::InvalidConfig("world must fit in y range -2048..2048"));
        }
        if self.updates_per_tick == 0 {
            return Err(LightError::InvalidConfig("updates_per_tick must be non-zero"));
        }
        if self.task_batch_size == 0 {
            return Err(LightError::InvalidConfig("task_batch_size must be non-zero"));
        }
        Ok(())
    }

    /// Lowest section y coordinate.
    #[must_use]
    pub fn min_section(&self) -> i32 {
        self.min_y >> 4
    }

    /// One past the highest section y coordinate.
    #[must_use]
    pub fn max_section(&self) -> i32 {
        (self.min_y + self.height) >> 4
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            min_y: -64,
            height: 384,
            has_sky_light: true,
            has_block_light: true,
            updates_per_tick: 1_000_000,
            task_batch_size: 1000,
        }
    }
}

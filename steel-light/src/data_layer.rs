//! Light storage for one section of one light layer.
//!
//! Light values are stored as 4-bit values (0-15), packed as two values per byte.
//! For a 16x16x16 section, this requires 2048 bytes (4096 cells / 2).

use crate::{MAX_LEVEL, error::LightError};

/// The number of bytes needed to store light data for a 16x16x16 section.
/// 16*16*16 cells = 4096 cells, at 4 bits per cell = 2048 bytes
pub const LAYER_SIZE: usize = 2048;

/// The number of cells in a section.
pub const CELL_COUNT: usize = 4096;

/// Light levels of a 16x16x16 section.
#[derive(Debug, Clone)]
pub enum DataLayer {
    /// Every cell in the section has the same light level (0-15).
    Homogeneous(u8),
    /// Cells have different light levels, stored as packed nibbles.
    /// Each byte contains two 4-bit light values, the even index in the low nibble.
    Heterogeneous(Box<[u8; LAYER_SIZE]>),
}

/// Index of a cell inside its section: `y * 256 + z * 16 + x`.
///
/// # Panics
/// If any coordinate is outside `0..16`.
#[must_use]
#[inline]
pub fn cell_index(x: usize, y: usize, z: usize) -> usize {
    assert!(
        x < 16 && y < 16 && z < 16,
        "section local coordinates out of range: ({x}, {y}, {z})"
    );
    (y << 8) | (z << 4) | x
}

#[inline]
const fn packed_byte(level: u8) -> u8 {
    (level & 0x0F) | ((level & 0x0F) << 4)
}

impl DataLayer {
    /// Creates a homogeneous layer with every cell at the given light level.
    #[must_use]
    pub fn new_filled(light_level: u8) -> Self {
        debug_assert!(light_level <= MAX_LEVEL, "Light level must be 0-15");
        Self::Homogeneous(light_level.min(MAX_LEVEL))
    }

    /// Creates a dark layer.
    #[must_use]
    pub fn new_empty() -> Self {
        Self::Homogeneous(0)
    }

    /// Gets the light level at the given section local position.
    #[must_use]
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> u8 {
        self.get_index(cell_index(x, y, z))
    }

    /// Gets the light level at a cell index produced by [`cell_index`].
    #[must_use]
    #[inline]
    pub fn get_index(&self, index: usize) -> u8 {
        assert!(index < CELL_COUNT, "cell index {index} out of range");
        match self {
            Self::Homogeneous(level) => *level,
            Self::Heterogeneous(data) => (data[index >> 1] >> ((index & 1) << 2)) & 0x0F,
        }
    }

    /// Sets the light level at the given section local position.
    ///
    /// If currently homogeneous and setting a different value, upgrades to heterogeneous.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, light_level: u8) {
        self.set_index(cell_index(x, y, z), light_level);
    }

    /// Sets the light level at a cell index produced by [`cell_index`].
    #[inline]
    pub fn set_index(&mut self, index: usize, light_level: u8) {
        assert!(index < CELL_COUNT, "cell index {index} out of range");
        debug_assert!(light_level <= MAX_LEVEL, "Light level must be 0-15");
        let light_level = light_level.min(MAX_LEVEL);

        if let Self::Homogeneous(current_level) = *self {
            if light_level == current_level {
                return;
            }
            *self = Self::Heterogeneous(Box::new([packed_byte(current_level); LAYER_SIZE]));
        }

        if let Self::Heterogeneous(data) = self {
            let shift = (index & 1) << 2;
            let byte = &mut data[index >> 1];
            *byte = (*byte & !(0x0F << shift)) | (light_level << shift);
        }
    }

    /// Sets every cell to the given level, collapsing back to the homogeneous form.
    pub fn fill(&mut self, light_level: u8) {
        *self = Self::new_filled(light_level);
    }

    /// Whether the layer is stored in the single-value form.
    #[must_use]
    pub fn is_homogeneous(&self) -> bool {
        matches!(self, Self::Homogeneous(_))
    }

    /// The level shared by every cell, whatever the representation.
    #[must_use]
    pub fn uniform_level(&self) -> Option<u8> {
        match self {
            Self::Homogeneous(level) => Some(*level),
            Self::Heterogeneous(data) => {
                let first = data[0];
                (first >> 4 == first & 0x0F && data.iter().all(|&b| b == first))
                    .then_some(first & 0x0F)
            }
        }
    }

    /// Builds a layer where every horizontal slice repeats the bottom slice of `above`.
    ///
    /// Sky light that reaches the bottom of a section falls straight through an
    /// empty section below it, so this is the initial state of such a section.
    #[must_use]
    pub fn repeat_first_layer(above: &DataLayer) -> Self {
        match above {
            Self::Homogeneous(level) => Self::Homogeneous(*level),
            Self::Heterogeneous(data) => {
                let mut repeated = Box::new([0u8; LAYER_SIZE]);
                // one y slice is 256 cells, 128 bytes
                for chunk in repeated.chunks_exact_mut(128) {
                    chunk.copy_from_slice(&data[..128]);
                }
                Self::Heterogeneous(repeated)
            }
        }
    }

    /// Serializes the layer: a single byte for homogeneous layers, 2048 bytes otherwise.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Homogeneous(level) => vec![*level],
            Self::Heterogeneous(data) => data.to_vec(),
        }
    }

    /// Deserializes a layer written by [`DataLayer::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LightError> {
        match bytes.len() {
            1 if bytes[0] <= MAX_LEVEL => Ok(Self::Homogeneous(bytes[0])),
            1 => Err(LightError::LevelOutOfRange(bytes[0])),
            LAYER_SIZE => {
                let mut data = Box::new([0u8; LAYER_SIZE]);
                data.copy_from_slice(bytes);
                Ok(Self::Heterogeneous(data))
            }
            len => Err(LightError::InvalidLayerLength(len)),
        }
    }
}

impl Default for DataLayer {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl PartialEq for DataLayer {
    /// Compares stored levels, not representations.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Homogeneous(a), Self::Homogeneous(b)) => a == b,
            (Self::Heterogeneous(a), Self::Heterogeneous(b)) => a[..] == b[..],
            (Self::Homogeneous(level), Self::Heterogeneous(data))
            | (Self::Heterogeneous(data), Self::Homogeneous(level)) => {
                let packed = packed_byte(*level);
                data.iter().all(|&b| b == packed)
            }
        }
    }
}

impl Eq for DataLayer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homogeneous_get() {
        let layer = DataLayer::new_filled(15);
        assert_eq!(layer.get(0, 0, 0), 15);
        assert_eq!(layer.get(15, 15, 15), 15);
    }

    #[test]
    fn test_set_upgrades_to_heterogeneous() {
        let mut layer = DataLayer::new_empty();
        layer.set(5, 5, 5, 14);

        assert_eq!(layer.get(5, 5, 5), 14);
        assert_eq!(layer.get(0, 0, 0), 0);
        assert!(!layer.is_homogeneous());
    }

    #[test]
    fn test_set_same_value_stays_homogeneous() {
        let mut layer = DataLayer::new_filled(7);
        layer.set(3, 4, 5, 7);
        assert!(layer.is_homogeneous());
    }

    #[test]
    fn test_packed_nibbles() {
        let mut layer = DataLayer::new_filled(3);

        // Two adjacent cells share a byte
        layer.set(0, 0, 0, 5);
        layer.set(1, 0, 0, 10);

        assert_eq!(layer.get(0, 0, 0), 5);
        assert_eq!(layer.get(1, 0, 0), 10);
        assert_eq!(layer.get(2, 0, 0), 3);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_rejects_out_of_range_coordinates() {
        let layer = DataLayer::new_empty();
        let _ = layer.get(16, 0, 0);
    }

    #[test]
    fn test_fill_collapses() {
        let mut layer = DataLayer::new_empty();
        layer.set(1, 2, 3, 9);
        layer.fill(4);
        assert!(layer.is_homogeneous());
        assert_eq!(layer.get(1, 2, 3), 4);
    }

    #[test]
    fn test_equality_ignores_representation() {
        let mut dense = DataLayer::new_filled(6);
        dense.set(0, 0, 0, 1);
        dense.set(0, 0, 0, 6);
        assert!(!dense.is_homogeneous());
        assert_eq!(dense, DataLayer::new_filled(6));
        assert_eq!(dense.uniform_level(), Some(6));
        assert_ne!(dense, DataLayer::new_filled(5));
    }

    #[test]
    fn test_bytes_preserve_values_and_homogeneity() {
        let homogeneous = DataLayer::new_filled(12);
        let decoded = DataLayer::from_bytes(&homogeneous.to_bytes()).expect("valid layer");
        assert!(decoded.is_homogeneous());
        assert_eq!(decoded, homogeneous);

        let mut dense = DataLayer::new_empty();
        for (i, (x, y, z)) in [(0, 0, 0), (15, 15, 15), (7, 3, 11), (8, 3, 11)]
            .into_iter()
            .enumerate()
        {
            dense.set(x, y, z, (i as u8 * 4) + 3);
        }
        let bytes = dense.to_bytes();
        assert_eq!(bytes.len(), LAYER_SIZE);
        let decoded = DataLayer::from_bytes(&bytes).expect("valid layer");
        assert!(!decoded.is_homogeneous());
        for index in 0..CELL_COUNT {
            assert_eq!(decoded.get_index(index), dense.get_index(index));
        }
    }

    #[test]
    fn test_rejects_bad_bytes() {
        assert!(matches!(
            DataLayer::from_bytes(&[0; 17]),
            Err(LightError::InvalidLayerLength(17))
        ));
        assert!(matches!(
            DataLayer::from_bytes(&[16]),
            Err(LightError::LevelOutOfRange(16))
        ));
    }

    #[test]
    fn test_repeat_first_layer() {
        let mut above = DataLayer::new_filled(15);
        above.set(4, 0, 9, 0);
        above.set(4, 1, 9, 2);
        let below = DataLayer::repeat_first_layer(&above);
        for y in 0..16 {
            assert_eq!(below.get(4, y, 9), 0);
            assert_eq!(below.get(5, y, 9), 15);
        }
    }
}

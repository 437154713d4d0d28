//! Per-section lifecycle state packed into a byte.

/// How much of a section the light layer keeps around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionType {
    /// No data, no loaded neighbor needs it.
    Empty,
    /// Data kept only to provide a border for a neighboring loaded section.
    LightOnly,
    /// Data backing a loaded, non-empty section.
    LightAndData,
}

/// Packed section state: bits 0-4 count non-empty neighbors (0-26), bit 5 marks
/// that the section itself holds blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionState(u8);

impl SectionState {
    const NEIGHBOR_COUNT_MASK: u8 = 0x1F;
    const HAS_DATA_FLAG: u8 = 0x20;

    /// The state of a section nothing refers to.
    pub const EMPTY: Self = Self(0);

    /// Number of non-empty sections among the 26 neighbors.
    #[must_use]
    pub const fn neighbor_count(self) -> u8 {
        self.0 & Self::NEIGHBOR_COUNT_MASK
    }

    /// Whether the section itself holds blocks.
    #[must_use]
    pub const fn has_data(self) -> bool {
        self.0 & Self::HAS_DATA_FLAG != 0
    }

    /// Returns the state with a new neighbor count, clamped to 0..=26.
    #[must_use]
    pub const fn with_neighbor_count(self, count: i32) -> Self {
        debug_assert!(count >= 0 && count <= 26, "neighbor count out of range");
        let count = if count < 0 {
            0
        } else if count > 26 {
            26
        } else {
            count as u8
        };
        Self((self.0 & !Self::NEIGHBOR_COUNT_MASK) | count)
    }

    /// Returns the state with the has-data flag set or cleared.
    #[must_use]
    pub const fn with_has_data(self, has_data: bool) -> Self {
        if has_data {
            Self(self.0 | Self::HAS_DATA_FLAG)
        } else {
            Self(self.0 & !Self::HAS_DATA_FLAG)
        }
    }

    /// The lifecycle category of this state.
    #[must_use]
    pub const fn section_type(self) -> SectionType {
        if self.has_data() {
            SectionType::LightAndData
        } else if self.neighbor_count() > 0 {
            SectionType::LightOnly
        } else {
            SectionType::Empty
        }
    }
}

//! Sparse, lifecycle-bound light storage.

pub mod layer_storage;
pub mod section_state;

pub use layer_storage::{
    LayerLightSectionStorage, LightLayer, LightSectionReader, SectionListener, SectionMap,
    local_index,
};
pub use section_state::{SectionState, SectionType};

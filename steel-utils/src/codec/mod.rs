//! Packed integer containers.

mod bit_storage;

pub use bit_storage::BitStorage;

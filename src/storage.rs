pub mod grid_point;
pub mod hash_storage;

pub use grid_point::{child_of, GridKey, GridPoint, GridPointFlags, Side, MAX_LEVEL};
pub use hash_storage::SparseGridStorage;

//! Brick generation, padding, and grid-to-grid regridding (shuffle).

pub mod generation;
pub mod padding;
pub mod partition;
pub mod shuffle;

pub use generation::{clip_to_logical, generate_bricks_dense, generate_bricks_sparse};
pub use padding::pad_brick;
pub use partition::{bricks_per_partition, default_target_partition_voxels, total_voxels};
pub use shuffle::{assemble_brick_fragments, realign_to_new_grid, split_brick};

//! Box algebra, Grid tiling, and shared types for the brickflow
//! volumetric regridding engine.
//!
//! This crate has no knowledge of Brick lifecycles or parallel
//! collections — it is the pure arithmetic layer, plus the external
//! accessor contract, that everything else builds on.

pub mod accessor;
pub mod box3;
pub mod coord;
pub mod dtype;
pub mod error;
pub mod grid;
pub mod voxels;

pub use accessor::{VolumeAccessor, VolumeWriter};
pub use box3::{extract_subvol, overwrite_subvol, Box3};
pub use coord::Coord3;
pub use dtype::Dtype;
pub use error::{Error, Result};
pub use grid::Grid;
pub use voxels::VoxelBuffer;

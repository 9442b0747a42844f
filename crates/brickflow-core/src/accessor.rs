//! The external collaborator contract: fetching and writing voxel data.
//!
//! These are object-safe traits so an `Arc<dyn VolumeAccessor>` can be
//! captured by a Brick's lazy thunk and moved across worker threads
//! without needing to serialise a closure.

use crate::box3::Box3;
use crate::coord::Coord3;
use crate::error::Result;
use crate::voxels::VoxelBuffer;

/// Fetches voxel data for a box from an external volume service.
///
/// An `Arc<dyn VolumeAccessor>` is cloned cheaply and shared by every
/// brick in a partition, while any expensive setup (credentials,
/// connections) happens once in the type's constructor.
pub trait VolumeAccessor: Send + Sync {
    /// Fetch the voxel data covering `b`. The returned buffer's shape
    /// must equal `shape(b)` and its dtype must be this accessor's fixed
    /// dtype.
    ///
    /// # Errors
    /// [`crate::Error::Transient`] for retry-eligible failures (503/504/
    /// timeout-equivalents); any other error is treated as permanent.
    fn fetch(&self, b: Box3) -> Result<VoxelBuffer>;

    /// The dtype this accessor always returns.
    fn dtype(&self) -> crate::dtype::Dtype;
}

/// Writes voxel data back to an external volume service.
pub trait VolumeWriter: Send + Sync {
    /// Write `buf` at `origin`, at the given downsample `scale` (0 = full
    /// resolution).
    ///
    /// # Errors
    /// Same retry-eligibility contract as [`VolumeAccessor::fetch`].
    fn write(&self, buf: &VoxelBuffer, origin: Coord3, scale: u32) -> Result<()>;
}

//! The `Brick`: a unit of work pairing a logical grid cell with a
//! lazily-materialised, transparently-compressible voxel buffer.

pub mod brick;
pub mod compressed;

pub use brick::Brick;
pub use compressed::CompressedVolume;

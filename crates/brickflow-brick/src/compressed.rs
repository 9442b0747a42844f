//! Transparent compression for a Brick's voxel buffer.
//!
//! A brick's buffer is compressed before it crosses a worker boundary
//! and decompressed lazily on first access afterward. The `zstd` codec
//! here matches the choice made for voxel-buffer compression in
//! volumetric-data crates elsewhere in this ecosystem.

use brickflow_core::{Coord3, Dtype, Error, Result, VoxelBuffer};
use serde::{Deserialize, Serialize};

/// A compressed voxel buffer, opaque until [`CompressedVolume::decompress`]
/// is called.
#[derive(Clone, Serialize, Deserialize)]
pub struct CompressedVolume {
    shape: [i64; 3],
    dtype_tag: u8,
    bytes: Vec<u8>,
}

fn dtype_tag(dtype: Dtype) -> u8 {
    match dtype {
        Dtype::U8 => 0,
        Dtype::U16 => 1,
        Dtype::U32 => 2,
        Dtype::U64 => 3,
    }
}

fn tag_dtype(tag: u8) -> Result<Dtype> {
    match tag {
        0 => Ok(Dtype::U8),
        1 => Ok(Dtype::U16),
        2 => Ok(Dtype::U32),
        3 => Ok(Dtype::U64),
        other => Err(Error::Materialisation(format!(
            "unrecognised dtype tag {other} in compressed brick payload"
        ))),
    }
}

/// `zstd` compression level used for brick transport. Chosen for
/// throughput over ratio since bricks are compressed on every shuffle
/// hop, not once for archival.
const COMPRESSION_LEVEL: i32 = 3;

impl CompressedVolume {
    /// Compress `volume`. Lossless for every supported dtype.
    ///
    /// # Errors
    /// [`Error::Compression`] if the underlying `zstd` encoder fails.
    pub fn compress(volume: &VoxelBuffer) -> Result<Self> {
        let raw = volume.as_bytes();
        let bytes = zstd::stream::encode_all(raw.as_slice(), COMPRESSION_LEVEL)
            .map_err(Error::Compression)?;
        Ok(Self {
            shape: volume.shape().to_array(),
            dtype_tag: dtype_tag(volume.dtype()),
            bytes,
        })
    }

    /// Decompress back into a [`VoxelBuffer`], bit-for-bit identical to
    /// the buffer originally compressed.
    ///
    /// # Errors
    /// [`Error::Compression`] if the underlying `zstd` decoder fails, or
    /// [`Error::Materialisation`] if the payload's dtype tag is corrupt.
    pub fn decompress(&self) -> Result<VoxelBuffer> {
        let raw =
            zstd::stream::decode_all(self.bytes.as_slice()).map_err(Error::Compression)?;
        let dtype = tag_dtype(self.dtype_tag)?;
        VoxelBuffer::from_bytes(&raw, Coord3::from_array(self.shape), dtype)
    }

    /// Size of the compressed payload in bytes (for memory accounting).
    #[must_use]
    pub fn compressed_len(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_is_lossless_for_every_dtype() {
        for dtype in [Dtype::U8, Dtype::U16, Dtype::U32, Dtype::U64] {
            let mut buf = VoxelBuffer::zeros(Coord3::new(3, 4, 5), dtype);
            match &mut buf {
                VoxelBuffer::U8(a) => a[[1, 2, 3]] = 200,
                VoxelBuffer::U16(a) => a[[1, 2, 3]] = 50_000,
                VoxelBuffer::U32(a) => a[[1, 2, 3]] = 3_000_000_000,
                VoxelBuffer::U64(a) => a[[1, 2, 3]] = u64::MAX,
            }
            let compressed = CompressedVolume::compress(&buf).unwrap();
            let restored = compressed.decompress().unwrap();
            assert_eq!(buf, restored);
        }
    }

    #[test]
    fn compressing_all_zero_buffer_is_small() {
        let buf = VoxelBuffer::zeros(Coord3::new(64, 64, 64), Dtype::U64);
        let compressed = CompressedVolume::compress(&buf).unwrap();
        assert!(compressed.compressed_len() < buf.as_bytes().len() / 4);
    }
}

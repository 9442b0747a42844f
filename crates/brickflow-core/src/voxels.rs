//! The dense, C-contiguous voxel buffer backing a Brick.

use crate::box3::{extract_subvol, overwrite_subvol, Box3};
use crate::coord::Coord3;
use crate::dtype::Dtype;
use crate::error::{Error, Result};
use ndarray::Array3;

/// A dense 3D buffer of voxels in one of the four supported scalar
/// dtypes. Stored C-contiguous (last-axis-fastest),
/// which is `ndarray`'s default (row-major) layout for a freshly built
/// array.
#[derive(Clone, Debug, PartialEq)]
pub enum VoxelBuffer {
    U8(Array3<u8>),
    U16(Array3<u16>),
    U32(Array3<u32>),
    U64(Array3<u64>),
}

/// Applies `$body` with `$buf` bound to the inner `Array3<$ty>` for
/// whichever variant `$self` holds, producing a value of the same shape
/// (used for the handful of operations that are truly dtype-generic).
macro_rules! dispatch {
    ($self:expr, |$buf:ident| $body:expr) => {
        match $self {
            VoxelBuffer::U8($buf) => $body,
            VoxelBuffer::U16($buf) => $body,
            VoxelBuffer::U32($buf) => $body,
            VoxelBuffer::U64($buf) => $body,
        }
    };
}

impl VoxelBuffer {
    #[must_use]
    pub fn dtype(&self) -> Dtype {
        match self {
            VoxelBuffer::U8(_) => Dtype::U8,
            VoxelBuffer::U16(_) => Dtype::U16,
            VoxelBuffer::U32(_) => Dtype::U32,
            VoxelBuffer::U64(_) => Dtype::U64,
        }
    }

    #[must_use]
    pub fn shape(&self) -> Coord3 {
        let s = dispatch!(self, |b| b.shape());
        Coord3::new(s[0] as i64, s[1] as i64, s[2] as i64)
    }

    /// Allocate a zero-filled buffer of the given shape and dtype.
    #[must_use]
    pub fn zeros(shape: Coord3, dtype: Dtype) -> Self {
        let dim = (shape.z as usize, shape.y as usize, shape.x as usize);
        match dtype {
            Dtype::U8 => VoxelBuffer::U8(Array3::zeros(dim)),
            Dtype::U16 => VoxelBuffer::U16(Array3::zeros(dim)),
            Dtype::U32 => VoxelBuffer::U32(Array3::zeros(dim)),
            Dtype::U64 => VoxelBuffer::U64(Array3::zeros(dim)),
        }
    }

    /// True if every voxel is zero (used by `BrickWall::drop_empty`).
    #[must_use]
    pub fn is_all_zero(&self) -> bool {
        dispatch!(self, |b| b.iter().all(|v| *v == 0))
    }

    /// Copy the subregion `b` (in the coordinate frame where this
    /// buffer's origin is `origin`) out as a new, same-dtype buffer.
    pub fn extract(&self, b: Box3, origin: Coord3) -> Result<Self> {
        Ok(match self {
            VoxelBuffer::U8(v) => VoxelBuffer::U8(extract_subvol(v, b, origin)?),
            VoxelBuffer::U16(v) => VoxelBuffer::U16(extract_subvol(v, b, origin)?),
            VoxelBuffer::U32(v) => VoxelBuffer::U32(extract_subvol(v, b, origin)?),
            VoxelBuffer::U64(v) => VoxelBuffer::U64(extract_subvol(v, b, origin)?),
        })
    }

    /// Overwrite the subregion `b` of this buffer (whose origin is
    /// `origin`) with `src`. Both buffers must share a dtype.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] if the dtypes differ (reported as a
    /// 0-sized mismatch) or `src`'s shape doesn't match `shape(b)`.
    pub fn overwrite(&mut self, b: Box3, origin: Coord3, src: &Self) -> Result<()> {
        match (self, src) {
            (VoxelBuffer::U8(dst), VoxelBuffer::U8(s)) => overwrite_subvol(dst, b, origin, s.view()),
            (VoxelBuffer::U16(dst), VoxelBuffer::U16(s)) => {
                overwrite_subvol(dst, b, origin, s.view())
            }
            (VoxelBuffer::U32(dst), VoxelBuffer::U32(s)) => {
                overwrite_subvol(dst, b, origin, s.view())
            }
            (VoxelBuffer::U64(dst), VoxelBuffer::U64(s)) => {
                overwrite_subvol(dst, b, origin, s.view())
            }
            _ => Err(Error::ContractViolation(
                "cannot overwrite a voxel buffer with one of a different dtype".to_string(),
            )),
        }
    }

    /// Raw bytes of the buffer's data in C-contiguous order, used by the
    /// compression codec. Panics (via `ndarray`) only if the array is
    /// not standard-layout, which freshly constructed/extracted arrays
    /// always are.
    #[must_use]
    pub fn as_bytes(&self) -> Vec<u8> {
        dispatch!(self, |b| {
            let standard = b.as_standard_layout();
            let slice = standard.as_slice().expect("standard layout is contiguous");
            slice
                .iter()
                .flat_map(|v| v.to_ne_bytes_vec())
                .collect::<Vec<u8>>()
        })
    }

    /// Reconstruct a buffer from bytes previously produced by
    /// [`VoxelBuffer::as_bytes`], given the dtype and shape.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] if `bytes.len()` doesn't match
    /// `shape.product() * dtype.size_of()`.
    pub fn from_bytes(bytes: &[u8], shape: Coord3, dtype: Dtype) -> Result<Self> {
        let expected_len = shape.product() as usize * dtype.size_of();
        if bytes.len() != expected_len {
            return Err(Error::ShapeMismatch {
                expected: shape.to_array(),
                actual: [bytes.len() as i64, 0, 0],
            });
        }
        let dim = (shape.z as usize, shape.y as usize, shape.x as usize);
        Ok(match dtype {
            Dtype::U8 => VoxelBuffer::U8(Array3::from_shape_vec(dim, bytes.to_vec())
                .map_err(|e| Error::Materialisation(e.to_string()))?),
            Dtype::U16 => {
                let values: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_ne_bytes([c[0], c[1]]))
                    .collect();
                VoxelBuffer::U16(
                    Array3::from_shape_vec(dim, values)
                        .map_err(|e| Error::Materialisation(e.to_string()))?,
                )
            }
            Dtype::U32 => {
                let values: Vec<u32> = bytes
                    .chunks_exact(4)
                    .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                VoxelBuffer::U32(
                    Array3::from_shape_vec(dim, values)
                        .map_err(|e| Error::Materialisation(e.to_string()))?,
                )
            }
            Dtype::U64 => {
                let values: Vec<u64> = bytes
                    .chunks_exact(8)
                    .map(|c| {
                        u64::from_ne_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                    })
                    .collect();
                VoxelBuffer::U64(
                    Array3::from_shape_vec(dim, values)
                        .map_err(|e| Error::Materialisation(e.to_string()))?,
                )
            }
        })
    }
}

/// Helper trait so [`VoxelBuffer::as_bytes`] can stay dtype-generic
/// without pulling in `bytemuck` for four fixed integer types.
trait ToNeBytesVec {
    fn to_ne_bytes_vec(&self) -> Vec<u8>;
}

impl ToNeBytesVec for u8 {
    fn to_ne_bytes_vec(&self) -> Vec<u8> {
        vec![*self]
    }
}
impl ToNeBytesVec for u16 {
    fn to_ne_bytes_vec(&self) -> Vec<u8> {
        self.to_ne_bytes().to_vec()
    }
}
impl ToNeBytesVec for u32 {
    fn to_ne_bytes_vec(&self) -> Vec<u8> {
        self.to_ne_bytes().to_vec()
    }
}
impl ToNeBytesVec for u64 {
    fn to_ne_bytes_vec(&self) -> Vec<u8> {
        self.to_ne_bytes().to_vec()
    }
}
